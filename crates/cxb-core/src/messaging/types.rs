/// Inline keyboard (buttons attached to one message, answered via callback).
#[derive(Clone, Debug)]
pub struct InlineKeyboard {
    pub buttons: Vec<InlineButton>,
}

#[derive(Clone, Debug)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn new(buttons: Vec<InlineButton>) -> Self {
        Self { buttons }
    }

    /// The yes/no confirmation keyboard used at the end of registration.
    pub fn yes_no() -> Self {
        Self::new(vec![
            InlineButton {
                label: "Yes".to_string(),
                callback_data: "yes".to_string(),
            },
            InlineButton {
                label: "No".to_string(),
                callback_data: "no".to_string(),
            },
        ])
    }
}

/// Persistent reply keyboard (the chat's menu buttons).
#[derive(Clone, Debug)]
pub struct ReplyKeyboard {
    /// Rows of button labels; pressing one sends the label as plain text.
    pub rows: Vec<Vec<String>>,
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub supports_edit: bool,
    pub supports_inline_keyboards: bool,
    pub supports_reply_keyboards: bool,
    pub max_message_len: usize,
}
