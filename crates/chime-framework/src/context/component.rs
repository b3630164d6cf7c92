//! Component interaction context.

use std::collections::HashMap;
use std::ops::Deref;

use chime_core::{
    BoxedBot, Channel, ComponentKind, InteractionHandle, InteractionResponse, Member, Message,
    MessagePayload, ModalField, RawInteraction, Reply, Role, User,
};

use super::ContextBase;
use crate::dispatcher::{EventKind, classify_interaction};
use crate::error::{ContextError, ContextResult, DispatchError, DispatchResult};

/// Shown by [`ComponentContext::all_fields`] for a file field with neither a
/// URL nor a filename.
pub const FILE_PLACEHOLDER: &str = "[file uploaded]";

/// The kind-specific payload of a component interaction.
///
/// The context's kind is derived from the variant, so the two never disagree.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentData {
    Button,
    StringSelect { values: Vec<String> },
    UserSelect { users: Vec<User> },
    RoleSelect { roles: Vec<Role> },
    ChannelSelect { channels: Vec<Channel> },
    MentionableSelect { users: Vec<User>, roles: Vec<Role> },
    Modal { fields: Vec<ModalField> },
}

impl ComponentData {
    fn from_interaction(kind: ComponentKind, interaction: &RawInteraction) -> Self {
        let data = &interaction.data;
        match kind {
            ComponentKind::Button => Self::Button,
            ComponentKind::StringSelect => Self::StringSelect {
                values: data.values.clone(),
            },
            ComponentKind::UserSelect => Self::UserSelect {
                users: data.resolved.users.clone(),
            },
            ComponentKind::RoleSelect => Self::RoleSelect {
                roles: data.resolved.roles.clone(),
            },
            ComponentKind::ChannelSelect => Self::ChannelSelect {
                channels: data.resolved.channels.clone(),
            },
            ComponentKind::MentionableSelect => Self::MentionableSelect {
                users: data.resolved.users.clone(),
                roles: data.resolved.roles.clone(),
            },
            ComponentKind::Modal => Self::Modal {
                fields: data.fields.clone(),
            },
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Button => ComponentKind::Button,
            Self::StringSelect { .. } => ComponentKind::StringSelect,
            Self::UserSelect { .. } => ComponentKind::UserSelect,
            Self::RoleSelect { .. } => ComponentKind::RoleSelect,
            Self::ChannelSelect { .. } => ComponentKind::ChannelSelect,
            Self::MentionableSelect { .. } => ComponentKind::MentionableSelect,
            Self::Modal { .. } => ComponentKind::Modal,
        }
    }
}

/// Context for a component handler.
///
/// Extractors for one kind fail with [`ContextError::WrongKind`] on any other.
/// Match on [`data`](Self::data) to handle several kinds in one handler.
pub struct ComponentContext {
    base: ContextBase,
    interaction: RawInteraction,
    data: ComponentData,
}

impl ComponentContext {
    /// Builds a context around a component interaction or modal submission.
    ///
    /// The kind comes from the interaction's own type tags. Slash commands and
    /// unclassifiable interactions are rejected.
    pub fn new(bot: BoxedBot, interaction: RawInteraction) -> DispatchResult<Self> {
        let kind = match classify_interaction(&interaction)? {
            EventKind::Component(kind) => kind,
            other => {
                return Err(DispatchError::MalformedEvent(format!(
                    "{other} interaction is not a component"
                )));
            }
        };
        let data = ComponentData::from_interaction(kind, &interaction);
        let base = ContextBase::new(
            bot,
            interaction.guild.clone(),
            None,
            interaction.channel_id,
            interaction.channel.clone(),
            interaction.user.clone(),
            interaction.member.clone(),
        );
        Ok(Self {
            base,
            interaction,
            data,
        })
    }

    pub fn kind(&self) -> ComponentKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ComponentData {
        &self.data
    }

    pub fn interaction(&self) -> &RawInteraction {
        &self.interaction
    }

    /// Returns the custom ID of the component or modal.
    pub fn custom_id(&self) -> &str {
        self.interaction.data.custom_id.as_deref().unwrap_or_default()
    }

    /// Returns the message the component is attached to.
    pub fn message(&self) -> Option<&Message> {
        self.interaction.message.as_ref()
    }

    /// Resolves the interacting user as a guild member; `None` outside a guild.
    pub async fn member(&self) -> ContextResult<Option<Member>> {
        self.base.member().await
    }

    fn handle(&self) -> InteractionHandle {
        self.interaction.handle()
    }

    // ------------------------------------------------------------------------
    // Response lifecycle
    // ------------------------------------------------------------------------

    /// Responds with a new message.
    pub async fn reply(&self, payload: impl Into<MessagePayload>) -> ContextResult<Reply> {
        let handle = self.handle();
        self.bot()
            .respond(&handle, InteractionResponse::Message(payload.into()))
            .await?;
        Ok(Reply::Interaction(handle))
    }

    /// Responds with a message only the user can see.
    pub async fn reply_ephemeral(&self, content: impl Into<String>) -> ContextResult<Reply> {
        self.reply(MessagePayload::text(content).ephemeral(true)).await
    }

    /// Acknowledges now; finish with [`edit_reply`](Self::edit_reply).
    pub async fn defer_reply(&self, ephemeral: bool) -> ContextResult<()> {
        self.bot()
            .respond(&self.handle(), InteractionResponse::DeferredMessage { ephemeral })
            .await?;
        Ok(())
    }

    /// Edits the response.
    pub async fn edit_reply(&self, payload: impl Into<MessagePayload>) -> ContextResult<()> {
        self.bot()
            .edit_original(&self.handle(), payload.into())
            .await?;
        Ok(())
    }

    /// Edits the message the component is attached to.
    ///
    /// Fails with [`ContextError::UnsupportedOperation`] for modal submissions.
    pub async fn update(&self, payload: impl Into<MessagePayload>) -> ContextResult<()> {
        if self.is_modal() {
            return Err(ContextError::UnsupportedOperation {
                operation: "update",
                kind: self.kind(),
            });
        }
        self.bot()
            .respond(&self.handle(), InteractionResponse::UpdateMessage(payload.into()))
            .await?;
        Ok(())
    }

    /// Acknowledges without changing anything.
    pub async fn defer_update(&self) -> ContextResult<()> {
        self.bot()
            .respond(&self.handle(), InteractionResponse::DeferredUpdate)
            .await?;
        Ok(())
    }

    /// Deletes the response.
    pub async fn delete_reply(&self) -> ContextResult<()> {
        self.bot().delete_original(&self.handle()).await?;
        Ok(())
    }

    /// Sends another message after the response.
    pub async fn follow_up(&self, payload: impl Into<MessagePayload>) -> ContextResult<Message> {
        Ok(self
            .bot()
            .follow_up(&self.handle(), payload.into())
            .await?)
    }

    // ------------------------------------------------------------------------
    // Kind predicates
    // ------------------------------------------------------------------------

    pub fn is_button(&self) -> bool {
        self.kind() == ComponentKind::Button
    }

    pub fn is_string_select(&self) -> bool {
        self.kind() == ComponentKind::StringSelect
    }

    pub fn is_user_select(&self) -> bool {
        self.kind() == ComponentKind::UserSelect
    }

    pub fn is_role_select(&self) -> bool {
        self.kind() == ComponentKind::RoleSelect
    }

    pub fn is_channel_select(&self) -> bool {
        self.kind() == ComponentKind::ChannelSelect
    }

    pub fn is_mentionable_select(&self) -> bool {
        self.kind() == ComponentKind::MentionableSelect
    }

    pub fn is_modal(&self) -> bool {
        self.kind() == ComponentKind::Modal
    }

    /// Returns `true` for any of the select-menu kinds.
    pub fn is_select_menu(&self) -> bool {
        self.kind().is_select_menu()
    }

    // ------------------------------------------------------------------------
    // Extractors
    // ------------------------------------------------------------------------

    fn wrong_kind(&self, accessor: &'static str, expected: ComponentKind) -> ContextError {
        ContextError::WrongKind {
            accessor,
            expected,
            actual: self.kind(),
        }
    }

    /// Selected values of a string select.
    pub fn values(&self) -> ContextResult<&[String]> {
        match &self.data {
            ComponentData::StringSelect { values } => Ok(values),
            _ => Err(self.wrong_kind("values", ComponentKind::StringSelect)),
        }
    }

    /// Selected users of a user select.
    pub fn users(&self) -> ContextResult<&[User]> {
        match &self.data {
            ComponentData::UserSelect { users } => Ok(users),
            _ => Err(self.wrong_kind("users", ComponentKind::UserSelect)),
        }
    }

    /// Selected roles of a role select.
    pub fn roles(&self) -> ContextResult<&[Role]> {
        match &self.data {
            ComponentData::RoleSelect { roles } => Ok(roles),
            _ => Err(self.wrong_kind("roles", ComponentKind::RoleSelect)),
        }
    }

    /// Selected channels of a channel select.
    pub fn channels(&self) -> ContextResult<&[Channel]> {
        match &self.data {
            ComponentData::ChannelSelect { channels } => Ok(channels),
            _ => Err(self.wrong_kind("channels", ComponentKind::ChannelSelect)),
        }
    }

    /// Selected users and roles of a mentionable select.
    pub fn mentionables(&self) -> ContextResult<(&[User], &[Role])> {
        match &self.data {
            ComponentData::MentionableSelect { users, roles } => Ok((users, roles)),
            _ => Err(self.wrong_kind("mentionables", ComponentKind::MentionableSelect)),
        }
    }

    fn modal_fields(&self, accessor: &'static str) -> ContextResult<&[ModalField]> {
        match &self.data {
            ComponentData::Modal { fields } => Ok(fields),
            _ => Err(self.wrong_kind(accessor, ComponentKind::Modal)),
        }
    }

    /// Returns a text field's value; `None` if absent, empty, or not a text field.
    pub fn field(&self, custom_id: &str) -> ContextResult<Option<&str>> {
        let value = self
            .modal_fields("field")?
            .iter()
            .find_map(|field| match field {
                ModalField::Text { custom_id: id, value } if id == custom_id => {
                    Some(value.as_str())
                }
                _ => None,
            });
        Ok(value.filter(|v| !v.is_empty()))
    }

    /// Returns every submitted field as text.
    ///
    /// File fields map to the attachment URL, else its filename, else
    /// [`FILE_PLACEHOLDER`].
    pub fn all_fields(&self) -> ContextResult<HashMap<String, String>> {
        let fields = self.modal_fields("all_fields")?;
        Ok(fields
            .iter()
            .map(|field| match field {
                ModalField::Text { custom_id, value } => (custom_id.clone(), value.clone()),
                ModalField::File {
                    custom_id,
                    attachment,
                } => {
                    let text = attachment
                        .as_ref()
                        .and_then(|a| a.url.clone().or_else(|| a.filename.clone()))
                        .unwrap_or_else(|| FILE_PLACEHOLDER.to_string());
                    (custom_id.clone(), text)
                }
            })
            .collect())
    }
}

impl Deref for ComponentContext {
    type Target = ContextBase;

    fn deref(&self) -> &ContextBase {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_core::testing::{self, BotCall, RecordingBot};
    use chime_core::{Attachment, Permissions};
    use std::sync::Arc;

    const SELECT_CODES: [(ComponentKind, u8); 6] = [
        (ComponentKind::Button, 2),
        (ComponentKind::StringSelect, 3),
        (ComponentKind::UserSelect, 5),
        (ComponentKind::RoleSelect, 6),
        (ComponentKind::MentionableSelect, 7),
        (ComponentKind::ChannelSelect, 8),
    ];

    fn ctx_for(kind: ComponentKind) -> ComponentContext {
        let interaction = match SELECT_CODES.iter().find(|(k, _)| *k == kind) {
            Some((_, code)) => testing::component("widget", *code),
            None => testing::modal("widget", Vec::new()),
        };
        ComponentContext::new(Arc::new(RecordingBot::new()), interaction).unwrap()
    }

    fn extract(ctx: &ComponentContext, kind: ComponentKind) -> ContextResult<()> {
        match kind {
            ComponentKind::Button => Ok(()),
            ComponentKind::StringSelect => ctx.values().map(drop),
            ComponentKind::UserSelect => ctx.users().map(drop),
            ComponentKind::RoleSelect => ctx.roles().map(drop),
            ComponentKind::ChannelSelect => ctx.channels().map(drop),
            ComponentKind::MentionableSelect => ctx.mentionables().map(drop),
            ComponentKind::Modal => ctx.all_fields().map(drop),
        }
    }

    #[test]
    fn test_extractors_guarded_by_kind() {
        for actual in ComponentKind::ALL {
            let ctx = ctx_for(actual);
            assert_eq!(ctx.kind(), actual);
            for requested in ComponentKind::ALL {
                if requested == ComponentKind::Button {
                    continue;
                }
                let result = extract(&ctx, requested);
                if requested == actual {
                    assert!(result.is_ok(), "{requested} on {actual}");
                } else {
                    assert!(
                        matches!(result, Err(ContextError::WrongKind { expected, actual: a, .. })
                            if expected == requested && a == actual),
                        "{requested} on {actual}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_kind_follows_interaction() {
        let bot: BoxedBot = Arc::new(RecordingBot::new());
        let ctx = ComponentContext::new(bot.clone(), testing::modal("form", Vec::new())).unwrap();
        assert!(ctx.is_modal());
        assert!(matches!(
            ctx.values(),
            Err(ContextError::WrongKind { actual: ComponentKind::Modal, .. })
        ));

        assert!(matches!(
            ComponentContext::new(bot.clone(), testing::slash("ping", Vec::new())),
            Err(DispatchError::MalformedEvent(_))
        ));
        assert!(matches!(
            ComponentContext::new(bot.clone(), testing::component("x", 4)),
            Err(DispatchError::UnknownInteractionKind(_))
        ));

        let mut no_type = testing::component("x", 2);
        no_type.data.component_type = None;
        assert!(matches!(
            ComponentContext::new(bot, no_type),
            Err(DispatchError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_predicates() {
        for kind in ComponentKind::ALL {
            let ctx = ctx_for(kind);
            assert_eq!(ctx.is_select_menu(), kind.is_select_menu());
            let flags = [
                ctx.is_button(),
                ctx.is_string_select(),
                ctx.is_user_select(),
                ctx.is_role_select(),
                ctx.is_channel_select(),
                ctx.is_mentionable_select(),
                ctx.is_modal(),
            ];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1);
        }
        assert!(!ctx_for(ComponentKind::Button).is_select_menu());
        assert!(!ctx_for(ComponentKind::Modal).is_select_menu());
    }

    #[test]
    fn test_select_values() {
        let mut interaction = testing::component("color", 3);
        interaction.data.values = vec!["red".into(), "blue".into()];
        let ctx = ComponentContext::new(Arc::new(RecordingBot::new()), interaction).unwrap();
        assert_eq!(ctx.values().unwrap(), ["red", "blue"]);
        assert_eq!(ctx.custom_id(), "color");
    }

    #[test]
    fn test_all_fields_with_file_fallbacks() {
        let interaction = testing::modal(
            "profile",
            vec![
                ModalField::Text {
                    custom_id: "bio".into(),
                    value: "hello".into(),
                },
                ModalField::File {
                    custom_id: "avatar".into(),
                    attachment: Some(Attachment {
                        id: 1,
                        filename: Some("pic.png".into()),
                        url: None,
                    }),
                },
                ModalField::File {
                    custom_id: "banner".into(),
                    attachment: None,
                },
            ],
        );
        let ctx = ComponentContext::new(Arc::new(RecordingBot::new()), interaction).unwrap();
        let fields = ctx.all_fields().unwrap();
        assert_eq!(fields["bio"], "hello");
        assert_eq!(fields["avatar"], "pic.png");
        assert_eq!(fields["banner"], FILE_PLACEHOLDER);

        assert_eq!(ctx.field("bio").unwrap(), Some("hello"));
        assert_eq!(ctx.field("avatar").unwrap(), None);
        assert_eq!(ctx.field("nope").unwrap(), None);
    }

    #[test]
    fn test_file_url_preferred() {
        let interaction = testing::modal(
            "upload",
            vec![ModalField::File {
                custom_id: "doc".into(),
                attachment: Some(Attachment {
                    id: 2,
                    filename: Some("doc.pdf".into()),
                    url: Some("https://cdn.example/doc.pdf".into()),
                }),
            }],
        );
        let ctx = ComponentContext::new(Arc::new(RecordingBot::new()), interaction).unwrap();
        assert_eq!(ctx.all_fields().unwrap()["doc"], "https://cdn.example/doc.pdf");
    }

    #[test]
    fn test_empty_text_field_is_absent() {
        let interaction = testing::modal(
            "form",
            vec![ModalField::Text {
                custom_id: "note".into(),
                value: String::new(),
            }],
        );
        let ctx = ComponentContext::new(Arc::new(RecordingBot::new()), interaction).unwrap();
        assert_eq!(ctx.field("note").unwrap(), None);
        assert_eq!(ctx.all_fields().unwrap()["note"], "");
    }

    #[tokio::test]
    async fn test_update_rejected_for_modal() {
        let ctx = ctx_for(ComponentKind::Modal);
        assert!(matches!(
            ctx.update("x").await,
            Err(ContextError::UnsupportedOperation { operation: "update", .. })
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_calls() {
        let bot = Arc::new(RecordingBot::new());
        let ctx = ComponentContext::new(bot.clone(), testing::component("confirm", 2)).unwrap();

        ctx.defer_reply(true).await.unwrap();
        ctx.edit_reply("done").await.unwrap();
        ctx.follow_up("and another").await.unwrap();
        ctx.delete_reply().await.unwrap();

        let calls = bot.take_calls();
        assert!(matches!(
            calls[0],
            BotCall::Respond {
                response: InteractionResponse::DeferredMessage { ephemeral: true },
                ..
            }
        ));
        assert!(matches!(calls[1], BotCall::EditOriginal { .. }));
        assert!(matches!(calls[2], BotCall::FollowUp { .. }));
        assert!(matches!(calls[3], BotCall::DeleteOriginal { .. }));

        ctx.update("new content").await.unwrap();
        ctx.reply_ephemeral("secret").await.unwrap();
        let calls = bot.take_calls();
        assert!(matches!(
            calls[0],
            BotCall::Respond { response: InteractionResponse::UpdateMessage(_), .. }
        ));
        match &calls[1] {
            BotCall::Respond {
                response: InteractionResponse::Message(payload),
                ..
            } => assert!(payload.ephemeral),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_member_from_interaction() {
        let ctx = ctx_for(ComponentKind::Button);
        let member = ctx.member().await.unwrap().unwrap();
        assert_eq!(member.permissions, Permissions::NONE);
    }
}
