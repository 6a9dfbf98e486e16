//! Text extraction from chat message payloads.
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captioned {
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExtendedText {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonReply {
    #[serde(default)]
    pub selected_display_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub title: Option<String>,
}

/// The message sub-types that can carry user-visible text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default)]
    pub image_message: Option<Captioned>,
    #[serde(default)]
    pub video_message: Option<Captioned>,
    #[serde(default)]
    pub extended_text_message: Option<ExtendedText>,
    #[serde(default)]
    pub buttons_response_message: Option<ButtonReply>,
    #[serde(default)]
    pub template_button_reply_message: Option<ButtonReply>,
    #[serde(default)]
    pub list_response_message: Option<ListResponse>,
    #[serde(default)]
    pub document_message: Option<Captioned>,
}

impl MessagePayload {
    /// First non-empty text in sub-type priority order, or `""`.
    #[must_use]
    pub fn text(&self) -> &str {
        let candidates = [
            self.conversation.as_deref(),
            self.image_message.as_ref().and_then(|m| m.caption.as_deref()),
            self.video_message.as_ref().and_then(|m| m.caption.as_deref()),
            self.extended_text_message
                .as_ref()
                .and_then(|m| m.text.as_deref()),
            self.buttons_response_message
                .as_ref()
                .and_then(|m| m.selected_display_text.as_deref()),
            self.template_button_reply_message
                .as_ref()
                .and_then(|m| m.selected_display_text.as_deref()),
            self.list_response_message
                .as_ref()
                .and_then(|m| m.title.as_deref()),
            self.document_message
                .as_ref()
                .and_then(|m| m.caption.as_deref()),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
            .unwrap_or("")
    }
}
