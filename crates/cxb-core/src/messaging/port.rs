use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{InlineKeyboard, MessagingCapabilities, ReplyKeyboard},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the first implementation; the shape is kept small enough that
/// another transport can fit behind it with capability flags.
#[async_trait]
pub trait MessengerPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text_html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    async fn send_reply_keyboard(
        &self,
        chat_id: ChatId,
        text_html: &str,
        keyboard: ReplyKeyboard,
    ) -> Result<MessageRef>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

#[cfg(test)]
pub mod testing {
    //! Recording messenger double for handler and digest tests.

    use std::sync::Mutex;

    use super::*;
    use crate::domain::MessageId;

    #[derive(Clone, Debug, PartialEq)]
    pub struct SentMessage {
        pub chat_id: ChatId,
        pub html: String,
    }

    #[derive(Default)]
    pub struct RecordingMessenger {
        pub sent: Mutex<Vec<SentMessage>>,
    }

    impl RecordingMessenger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.chat_id == chat_id)
                .map(|m| m.html.clone())
                .collect()
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn record(&self, chat_id: ChatId, html: &str) -> MessageRef {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentMessage {
                chat_id,
                html: html.to_string(),
            });
            MessageRef {
                chat_id,
                message_id: MessageId(sent.len() as i32),
            }
        }
    }

    #[async_trait]
    impl MessengerPort for RecordingMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_html: true,
                supports_edit: true,
                supports_inline_keyboards: true,
                supports_reply_keyboards: true,
                max_message_len: 4096,
            }
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            Ok(self.record(chat_id, html))
        }

        async fn edit_html(&self, _msg: MessageRef, _html: &str) -> Result<()> {
            Ok(())
        }

        async fn send_inline_keyboard(
            &self,
            chat_id: ChatId,
            text_html: &str,
            _keyboard: InlineKeyboard,
        ) -> Result<MessageRef> {
            Ok(self.record(chat_id, text_html))
        }

        async fn send_reply_keyboard(
            &self,
            chat_id: ChatId,
            text_html: &str,
            _keyboard: ReplyKeyboard,
        ) -> Result<MessageRef> {
            Ok(self.record(chat_id, text_html))
        }

        async fn answer_callback_query(
            &self,
            _callback_id: &str,
            _text: Option<&str>,
        ) -> Result<()> {
            Ok(())
        }
    }
}
