use engine::{Engine, RateSource, Reply};
use teloxide::{
    RequestError,
    prelude::*,
    types::{MessageId, ParseMode, ReplyParameters, User},
};

use crate::{
    ConfigParameters,
    state::{SessionKey, SessionStore},
    ui::{self, Rendered},
};

/// Where rendered replies are sent.
pub(crate) trait Outbox: Send + Sync {
    fn send(
        &self,
        rendered: Rendered,
    ) -> impl Future<Output = Result<MessageId, RequestError>> + Send;

    fn pin(&self, message_id: MessageId) -> impl Future<Output = Result<(), RequestError>> + Send;
}

/// Answers in the chat of the message being handled.
struct ChatReplies<'a> {
    bot: &'a Bot,
    msg: &'a Message,
}

impl Outbox for ChatReplies<'_> {
    async fn send(&self, rendered: Rendered) -> Result<MessageId, RequestError> {
        let mut request = self
            .bot
            .send_message(self.msg.chat.id, rendered.text)
            .parse_mode(ParseMode::Html);
        if rendered.quote {
            request = request.reply_parameters(ReplyParameters::new(self.msg.id));
        }
        if let Some(markup) = rendered.markup {
            request = request.reply_markup(markup);
        }
        Ok(request.await?.id)
    }

    async fn pin(&self, message_id: MessageId) -> Result<(), RequestError> {
        self.bot
            .pin_chat_message(self.msg.chat.id, message_id)
            .await?;
        Ok(())
    }
}

pub(crate) async fn handle_message(
    bot: Bot,
    msg: Message,
    cfg: ConfigParameters,
) -> ResponseResult<()> {
    if !is_allowed(&cfg, msg.from.as_ref()) {
        return Ok(());
    }

    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let key = SessionKey {
        chat_id: msg.chat.id,
        user_id: from.id,
    };

    let replies = ChatReplies {
        bot: &bot,
        msg: &msg,
    };
    converse(&cfg.engine, &cfg.sessions, key, text, &replies).await
}

/// Feeds `text` to the conversation of `key` and delivers the reply.
///
/// The session lock stays held until the reply is delivered, so the next
/// input of this user waits for the rate lookup of the current one. A reply
/// that cannot be delivered drops the conversation.
pub(crate) async fn converse<R: RateSource, O: Outbox>(
    engine: &Engine<R>,
    sessions: &SessionStore,
    key: SessionKey,
    text: &str,
    outbox: &O,
) -> ResponseResult<()> {
    let session = sessions.session(key).await;
    let mut ctx = session.lock().await;
    let reply = engine.handle_input(&mut ctx, text).await;
    let delivered = deliver(outbox, &reply).await;
    if let Err(err) = &delivered {
        tracing::error!(
            "failed to deliver reply in chat {}, dropping conversation: {err}",
            key.chat_id.0
        );
        ctx.reset();
    }
    drop(ctx);
    drop(session);

    sessions.remove_if_idle(key).await;
    delivered
}

async fn deliver<O: Outbox>(outbox: &O, reply: &Reply) -> ResponseResult<()> {
    for outbound in &reply.messages {
        let sent = outbox.send(ui::render(&outbound.response)).await?;

        if outbound.pinned
            && let Err(err) = outbox.pin(sent).await
        {
            tracing::warn!("failed to pin summary: {err}");
        }
    }
    Ok(())
}

fn is_allowed(cfg: &ConfigParameters, from: Option<&User>) -> bool {
    let Some(from) = from else {
        return false;
    };
    match &cfg.allowed_users {
        None => true,
        Some(ids) => ids.contains(&from.id),
    }
}
