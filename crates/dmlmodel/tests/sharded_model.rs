#![allow(clippy::manual_async_fn)]

mod fixtures;

use std::sync::Arc;

use asupersync::runtime::RuntimeBuilder;
use dmlmodel::prelude::*;

use fixtures::*;

#[test]
fn resolve_table_uses_modulo() {
    let descriptor = ModelDescriptor::of::<Player>().expect("player model is valid");
    assert_eq!(descriptor.resolve_table(7), "player_3");
    assert_eq!(descriptor.resolve_table(4), "player_0");
    assert_eq!(descriptor.with_shards(0).resolve_table(7), "player");
}

#[test]
fn shard_key_routes_each_statement() {
    let channel = Arc::new(ScriptedChannel::new());
    let mut players = Dml::for_model::<Player>(Arc::clone(&channel)).expect("player model");
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    channel.reply(Completion::new().with_insert_id(7));
    channel.reply(Completion::new().with_rows(vec![vec![text("ayla"), text("12")]]));
    channel.reply(Completion::new().with_rows(vec![vec![text("3")]]));

    rt.block_on(async {
        let data = Record::new().with("id", 7).with("name", "ayla").with("level", 12);
        unwrap_outcome(players.shard(7).insert(&cx, &data).await);

        let rows = unwrap_outcome(
            players
                .shard(7)
                .eq("id", 7)
                .find(&cx, &["name", "level"])
                .await,
        );
        assert_eq!(rows[0].get("level"), Some(&Value::Int(12)));

        let n = unwrap_outcome(players.gte("level", 10).count(&cx).await);
        assert_eq!(n, 3);
    });

    assert_eq!(
        channel.sent(),
        vec![
            "INSERT INTO player_3 (id,name,level) VALUES (7,'ayla',12)".to_string(),
            "SELECT name,level FROM player_3 WHERE id=7".to_string(),
            "SELECT COUNT(*) FROM player WHERE level>=10".to_string(),
        ]
    );
}

#[test]
fn context_token_reaches_channel() {
    let channel = Arc::new(ScriptedChannel::new());
    let model = Arc::new(ModelDescriptor::of::<Player>().expect("player model"));
    let config = DmlConfig::new().context(ContextToken(11)).log_data_on_error(false);
    let mut players = Dml::with_config(model, Arc::clone(&channel), config);
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    channel.reply(Completion::new().with_affected_rows(1));
    channel.reply(Completion::new().with_affected_rows(1));

    rt.block_on(async {
        let data = Record::new().with("level", 13);
        unwrap_outcome(players.eq("id", 7).update(&cx, &data).await);
        unwrap_outcome(
            players
                .context(ContextToken(2))
                .shard(6)
                .eq("id", 6)
                .update(&cx, &data)
                .await,
        );
    });

    assert_eq!(
        channel.contexts(),
        vec![Some(ContextToken(11)), Some(ContextToken(2))]
    );
    assert_eq!(
        channel.last().as_deref(),
        Some("UPDATE player_2 SET level=13 WHERE id=6")
    );
}

#[test]
fn statements_can_be_built_without_dispatch() {
    let channel = Arc::new(ScriptedChannel::new());
    let mut players = Dml::for_model::<Player>(Arc::clone(&channel)).expect("player model");

    let statement = players
        .shard(-1)
        .eq("name", "x")
        .order_by("level", Direction::Desc)
        .limit(5)
        .build_find(&["id"])
        .expect("valid find");
    assert_eq!(statement.table, "player_3");
    assert_eq!(
        statement.sql,
        "SELECT id FROM player_3 WHERE name='x' ORDER BY level DESC LIMIT 5"
    );
    assert!(players.is_clear());
    assert!(channel.sent().is_empty());
}
