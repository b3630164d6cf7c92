use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chime_core::testing::{self, BotCall, GUILD_ID, RecordingBot, USER_ID};
use chime_core::{
    ApiError, BoxedBot, CommandOption, ComponentKind, InteractionResponse, InvocationMode,
    MessagePayload, ModalField, OptionType, OptionValue, Permissions, RawEvent,
};
use chime_framework::{
    CommandContext, CommandHandler, CommandOptions, ComponentContext, ComponentOptions,
    ContextError, CooldownTracker, DispatchError, DispatchOutcome, DispatchRequest, Dispatcher,
    ManualClock, MetadataRegistry, command_fn, component_fn,
};
use tokio_test::{assert_err, assert_ok};
use tower::{Service, ServiceExt};

const T: u64 = 1_700_000_000_000;

/// Values a handler saw, for assertions after dispatch.
#[derive(Default)]
struct Seen(Mutex<Vec<String>>);

impl Seen {
    fn set(&self, value: Vec<String>) {
        *self.0.lock().unwrap() = value;
    }

    fn get(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let c = Arc::new(AtomicUsize::new(0));
    (c.clone(), c)
}

fn counting_command(hits: Arc<AtomicUsize>) -> impl CommandHandler {
    command_fn(move |_bot: BoxedBot, _ctx: CommandContext| {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

fn dispatcher_with(registry: MetadataRegistry) -> (Arc<ManualClock>, Dispatcher) {
    let clock = Arc::new(ManualClock::new(T));
    let dispatcher = Dispatcher::new(registry)
        .with_prefixes(["!"])
        .with_cooldowns(CooldownTracker::with_clock(clock.clone()));
    (clock, dispatcher)
}

fn text_option(name: &str, kind: OptionType, value: OptionValue) -> CommandOption {
    CommandOption {
        name: name.into(),
        kind,
        value: Some(value),
        focused: false,
        options: Vec::new(),
    }
}

fn responses(bot: &RecordingBot) -> Vec<MessagePayload> {
    bot.calls()
        .into_iter()
        .filter_map(|call| match call {
            BotCall::Respond {
                response: InteractionResponse::Message(payload),
                ..
            } => Some(payload),
            BotCall::ReplyMessage { payload, .. } => Some(payload),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_prefix_command_receives_args() {
    let seen = Arc::new(Seen::default());
    let slot = Arc::clone(&seen);

    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("play", "Play a round").mode(InvocationMode::Prefix),
            command_fn(move |_bot, ctx: CommandContext| {
                let slot = Arc::clone(&slot);
                async move {
                    slot.set(ctx.args()?);
                    Ok(())
                }
            }),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);
    let bot = Arc::new(RecordingBot::new());

    let outcome = dispatcher
        .dispatch(bot.clone(), testing::message("!play rock paper").into())
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Executed);
    assert_eq!(seen.get(), ["rock", "paper"]);

    dispatcher
        .dispatch(bot, testing::message("!PLAY   ").into())
        .await
        .unwrap();
    assert!(seen.get().is_empty());
}

#[tokio::test]
async fn test_mode_filtering() {
    let (slash_hits, slash_count) = counter();
    let (prefix_hits, prefix_count) = counter();
    let (both_hits, both_count) = counter();

    let mut registry = MetadataRegistry::new();
    registry
        .add_command(CommandOptions::new("slashy", "s"), counting_command(slash_hits))
        .unwrap();
    registry
        .add_command(
            CommandOptions::new("prefixy", "p").mode(InvocationMode::Prefix),
            counting_command(prefix_hits),
        )
        .unwrap();
    registry
        .add_command(
            CommandOptions::new("either", "e").mode(InvocationMode::Both),
            counting_command(both_hits),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);
    let bot: BoxedBot = Arc::new(RecordingBot::new());

    let cases: [(RawEvent, DispatchOutcome); 6] = [
        (testing::slash("slashy", vec![]).into(), DispatchOutcome::Executed),
        (testing::message("!slashy").into(), DispatchOutcome::Ignored),
        (testing::slash("prefixy", vec![]).into(), DispatchOutcome::Ignored),
        (testing::message("!prefixy").into(), DispatchOutcome::Executed),
        (testing::slash("either", vec![]).into(), DispatchOutcome::Executed),
        (testing::message("!either").into(), DispatchOutcome::Executed),
    ];
    for (event, expected) in cases {
        assert_eq!(dispatcher.dispatch(bot.clone(), event).await.unwrap(), expected);
    }

    assert_eq!(slash_count.load(Ordering::SeqCst), 1);
    assert_eq!(prefix_count.load(Ordering::SeqCst), 1);
    assert_eq!(both_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_identifiers_ignored() {
    let (_, dispatcher) = dispatcher_with(MetadataRegistry::new());
    let bot: BoxedBot = Arc::new(RecordingBot::new());

    for event in [
        RawEvent::from(testing::slash("ghost", vec![])),
        RawEvent::from(testing::component("ghost", 2)),
        RawEvent::from(testing::modal("ghost", vec![])),
        RawEvent::from(testing::message("!ghost")),
        RawEvent::from(testing::message("no prefix here")),
    ] {
        assert_eq!(
            dispatcher.dispatch(bot.clone(), event).await.unwrap(),
            DispatchOutcome::Ignored
        );
    }
}

#[tokio::test]
async fn test_bot_authors_ignored() {
    let (hits, count) = counter();
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("ping", "p").mode(InvocationMode::Prefix),
            counting_command(hits),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);

    let mut message = testing::message("!ping");
    message.author.bot = true;
    let outcome = dispatcher
        .dispatch(Arc::new(RecordingBot::new()), message.clone().into())
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Ignored);

    let dispatcher = dispatcher.ignore_bots(false);
    let outcome = dispatcher
        .dispatch(Arc::new(RecordingBot::new()), message.into())
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Executed);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_user_cooldown_window() {
    let (hits, count) = counter();
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("daily", "Claim").user_cooldown(Duration::from_millis(5000)),
            counting_command(hits),
        )
        .unwrap();
    let (clock, dispatcher) = dispatcher_with(registry);
    let bot = Arc::new(RecordingBot::new());
    let event = || RawEvent::from(testing::slash("daily", vec![]));

    assert_eq!(
        dispatcher.dispatch(bot.clone(), event()).await.unwrap(),
        DispatchOutcome::Executed
    );

    clock.set(T + 2000);
    let outcome = dispatcher.dispatch(bot.clone(), event()).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::CoolingDown {
            remaining_ms: 3000,
            expires_at: T + 5000
        }
    );
    assert_eq!(count.load(Ordering::SeqCst), 1);
    let notice = responses(&bot).pop().unwrap();
    assert!(notice.ephemeral);
    assert!(notice.content.unwrap().contains(&format!("<t:{}:R>", (T + 5000) / 1000)));

    // The rejected attempt did not extend the window.
    clock.set(T + 5001);
    assert_eq!(
        dispatcher.dispatch(bot.clone(), event()).await.unwrap(),
        DispatchOutcome::Executed
    );
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(
        dispatcher.cooldowns().remaining("daily", USER_ID, Some(GUILD_ID)),
        5000
    );
}

#[tokio::test]
async fn test_guild_cooldown_applies_to_other_users() {
    let (hits, _) = counter();
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("raid", "Start a raid")
                .user_cooldown(Duration::from_secs(1))
                .guild_cooldown(Duration::from_secs(30)),
            counting_command(hits),
        )
        .unwrap();
    let (clock, dispatcher) = dispatcher_with(registry);
    let bot: BoxedBot = Arc::new(RecordingBot::new());

    dispatcher
        .dispatch(bot.clone(), testing::slash("raid", vec![]).into())
        .await
        .unwrap();

    clock.set(T + 10_000);
    let mut other = testing::slash("raid", vec![]);
    other.user = testing::user(999, "bob");
    other.member = None;
    let outcome = dispatcher.dispatch(bot, other.into()).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::CoolingDown {
            remaining_ms: 20_000,
            expires_at: T + 30_000
        }
    );
}

struct CustomNotice;

#[async_trait]
impl CommandHandler for CustomNotice {
    async fn execute(&self, _bot: BoxedBot, _ctx: CommandContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn cooldown(
        &self,
        _bot: &BoxedBot,
        _ctx: &CommandContext,
        expires_at: u64,
    ) -> MessagePayload {
        MessagePayload::text(format!("wait until {expires_at}"))
    }
}

#[tokio::test]
async fn test_custom_cooldown_notice() {
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("spin", "Spin")
                .mode(InvocationMode::Both)
                .user_cooldown(Duration::from_secs(10)),
            CustomNotice,
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);
    let bot = Arc::new(RecordingBot::new());

    dispatcher
        .dispatch(bot.clone(), testing::message("!spin").into())
        .await
        .unwrap();
    // Slash and prefix invocations share the cooldown.
    dispatcher
        .dispatch(bot.clone(), testing::slash("spin", vec![]).into())
        .await
        .unwrap();

    let notice = responses(&bot).pop().unwrap();
    assert_eq!(notice.content.as_deref(), Some(format!("wait until {}", T + 10_000).as_str()));
}

#[tokio::test]
async fn test_failed_handler_does_not_refresh_cooldown() {
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("flaky", "Fails").user_cooldown(Duration::from_secs(60)),
            command_fn(|_bot, _ctx: CommandContext| async {
                Err(anyhow::anyhow!("upstream down"))
            }),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);

    let err = dispatcher
        .dispatch(Arc::new(RecordingBot::new()), testing::slash("flaky", vec![]).into())
        .await
        .unwrap_err();
    match err {
        DispatchError::Handler { identifier, source } => {
            assert_eq!(identifier, "flaky");
            assert_eq!(source.to_string(), "upstream down");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(dispatcher.cooldowns().is_empty());
}

#[tokio::test]
async fn test_guard_errors_propagate_unchanged() {
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("args", "Reads args"),
            command_fn(|_bot, ctx: CommandContext| async move {
                ctx.args()?;
                Ok(())
            }),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);

    let err = dispatcher
        .dispatch(Arc::new(RecordingBot::new()), testing::slash("args", vec![]).into())
        .await
        .unwrap_err();
    let DispatchError::Handler { source, .. } = err else {
        panic!("expected handler error");
    };
    assert!(matches!(
        source.downcast_ref::<ContextError>(),
        Some(ContextError::WrongMode { expected: "prefix", .. })
    ));
}

#[tokio::test]
async fn test_option_types_reach_handler() {
    let seen = Arc::new(Seen::default());
    let slot = Arc::clone(&seen);

    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("roll", "Roll dice"),
            command_fn(move |_bot, ctx: CommandContext| {
                let slot = Arc::clone(&slot);
                async move {
                    let sides = ctx.option("sides")?.map(|o| o.kind());
                    let missing = ctx.option("label")?.is_none();
                    slot.set(vec![format!("{sides:?}"), missing.to_string()]);
                    Ok(())
                }
            }),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);

    let event = testing::slash(
        "roll",
        vec![text_option("sides", OptionType::Integer, OptionValue::Integer(20))],
    );
    dispatcher
        .dispatch(Arc::new(RecordingBot::new()), event.into())
        .await
        .unwrap();
    assert_eq!(seen.get(), ["Some(Integer)", "true"]);
}

#[tokio::test]
async fn test_member_permission_enforced() {
    let (hits, count) = counter();
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("ban", "Ban").member_permission(Permissions::BAN_MEMBERS),
            counting_command(hits),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);
    let bot = Arc::new(RecordingBot::new());

    let outcome = dispatcher
        .dispatch(bot.clone(), testing::slash("ban", vec![]).into())
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::MissingPermission);
    assert!(responses(&bot).pop().unwrap().ephemeral);

    let mut admin = testing::slash("ban", vec![]);
    if let Some(member) = admin.member.as_mut() {
        member.permissions = Permissions::ADMINISTRATOR;
    }
    assert_eq!(
        dispatcher.dispatch(bot.clone(), admin.into()).await.unwrap(),
        DispatchOutcome::Executed
    );

    let dm = testing::without_guild(testing::slash("ban", vec![]));
    assert_eq!(
        dispatcher.dispatch(bot, dm.into()).await.unwrap(),
        DispatchOutcome::MissingPermission
    );
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_notice_is_api_error() {
    let (hits, count) = counter();
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(
            CommandOptions::new("kick", "Kick")
                .mode(InvocationMode::Both)
                .member_permission(Permissions::KICK_MEMBERS),
            counting_command(hits),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);
    let bot = Arc::new(RecordingBot::new());
    bot.fail_with(ApiError::Timeout);

    let err = dispatcher
        .dispatch(bot.clone(), testing::slash("kick", vec![]).into())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Api(ApiError::Timeout)), "{err:?}");

    let err = dispatcher
        .dispatch(bot.clone(), testing::message("!kick").into())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Api(ApiError::Timeout)), "{err:?}");
    assert_eq!(responses(&bot).len(), 2);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_component_dispatch_and_kind_match() {
    let (hits, count) = counter();
    let mut registry = MetadataRegistry::new();
    registry
        .add_component(
            ComponentOptions::new("colors").kind(ComponentKind::StringSelect),
            component_fn(move |_bot, ctx: ComponentContext| {
                let hits = Arc::clone(&hits);
                async move {
                    assert!(ctx.is_select_menu());
                    ctx.update(format!("picked {}", ctx.values()?.join(","))).await?;
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);
    let bot = Arc::new(RecordingBot::new());

    let mut select = testing::component("colors", 3);
    select.data.values = vec!["red".into(), "green".into()];
    assert_eq!(
        dispatcher.dispatch(bot.clone(), select.into()).await.unwrap(),
        DispatchOutcome::Executed
    );
    assert_eq!(
        bot.calls(),
        vec![BotCall::Respond {
            interaction_id: 900,
            response: InteractionResponse::UpdateMessage(MessagePayload::text("picked red,green")),
        }]
    );

    // Same custom ID, different component type.
    assert_eq!(
        dispatcher
            .dispatch(bot, testing::component("colors", 2).into())
            .await
            .unwrap(),
        DispatchOutcome::Ignored
    );
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_modal_fields_reach_handler() {
    let seen = Arc::new(Seen::default());
    let slot = Arc::clone(&seen);

    let mut registry = MetadataRegistry::new();
    registry
        .add_component(
            ComponentOptions::new("profile").kind(ComponentKind::Modal),
            component_fn(move |_bot, ctx: ComponentContext| {
                let slot = Arc::clone(&slot);
                async move {
                    let fields = ctx.all_fields()?;
                    slot.set(vec![fields["bio"].clone(), fields["avatar"].clone()]);
                    Ok(())
                }
            }),
        )
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);

    let event = testing::modal(
        "profile",
        vec![
            ModalField::Text {
                custom_id: "bio".into(),
                value: "hello".into(),
            },
            ModalField::File {
                custom_id: "avatar".into(),
                attachment: Some(chime_core::Attachment {
                    id: 5,
                    filename: Some("pic.png".into()),
                    url: None,
                }),
            },
        ],
    );
    dispatcher
        .dispatch(Arc::new(RecordingBot::new()), event.into())
        .await
        .unwrap();
    assert_eq!(seen.get(), ["hello", "pic.png"]);
}

#[tokio::test]
async fn test_unknown_interaction_kind_is_error() {
    let (_, dispatcher) = dispatcher_with(MetadataRegistry::new());
    let mut ping = testing::slash("x", vec![]);
    ping.kind = chime_core::InteractionType::Ping;
    let result = dispatcher
        .dispatch(Arc::new(RecordingBot::new()), ping.into())
        .await;
    assert!(matches!(result, Err(DispatchError::UnknownInteractionKind(_))));
}

#[tokio::test]
async fn test_dispatch_json() {
    let (hits, count) = counter();
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(CommandOptions::new("ping", "Ping"), counting_command(hits))
        .unwrap();
    let (_, dispatcher) = dispatcher_with(registry);
    let bot: BoxedBot = Arc::new(RecordingBot::new());

    let json = r#"{"t": "INTERACTION_CREATE", "d": {
        "id": 1, "token": "t", "type": 2,
        "user": {"id": 300, "name": "alice"},
        "data": {"name": "ping"}
    }}"#;
    assert_ok!(dispatcher.dispatch_json(bot.clone(), json).await);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let result = dispatcher.dispatch_json(bot, "{not json").await;
    assert!(matches!(assert_err!(result), DispatchError::MalformedEvent(_)));
}

#[tokio::test]
async fn test_tower_service() {
    let (hits, count) = counter();
    let mut registry = MetadataRegistry::new();
    registry
        .add_command(CommandOptions::new("ping", "Ping"), counting_command(hits))
        .unwrap();
    let (_, mut dispatcher) = dispatcher_with(registry);

    let request = DispatchRequest::new(
        Arc::new(RecordingBot::new()),
        testing::slash("ping", vec![]),
    );
    let outcome = dispatcher.ready().await.unwrap().call(request).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Executed);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
