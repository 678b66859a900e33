use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use roomlist_core::{
    Conversation, ConversationKind, ListConfig, ListHandle, ListRuntime, LoopbackChatService,
    MemoryStore, QueryCriteria, SortKey, ViewPhase, ViewRow, ViewState,
};

#[derive(Parser, Debug)]
#[command(name = "roomlist-repl")]
#[command(about = "Interactive conversation-list demo over the in-memory store")]
struct Args {
    /// Records per page in the ungrouped view
    #[arg(long, default_value_t = 20)]
    page_size: usize,

    /// Search debounce window in milliseconds
    #[arg(long, default_value_t = 300)]
    debounce_ms: u64,

    /// Log filter directive, e.g. "roomlist_core=debug" (falls back to RUST_LOG)
    #[arg(long)]
    log: Option<String>,
}

fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn seed() -> Vec<Conversation> {
    let mut records = Vec::new();

    let mut general = Conversation::new("general", ConversationKind::PublicChannel, 9_000);
    general.unread = 2;
    records.push(general);

    records.push(Conversation::new(
        "random",
        ConversationKind::PublicChannel,
        8_000,
    ));

    let mut design = Conversation::new("design", ConversationKind::PrivateChannel, 7_500);
    design.favorite = true;
    records.push(design);

    let mut platform = Conversation::new("platform", ConversationKind::Team, 7_000);
    platform.team_main = true;
    records.push(platform);

    let mut rollout = Conversation::new("q3-rollout", ConversationKind::Discussion, 6_500);
    rollout.parent_id = Some("platform".to_string());
    records.push(rollout);

    let mut jdoe = Conversation::new("jdoe", ConversationKind::Direct, 6_000);
    jdoe.fname = Some("Jane Doe".to_string());
    jdoe.alert = true;
    records.push(jdoe);

    let mut msmith = Conversation::new("msmith", ConversationKind::Direct, 5_500);
    msmith.fname = Some("Mina Smith".to_string());
    records.push(msmith);

    let mut visitor_a = Conversation::new("visitor-1041", ConversationKind::Omnichannel, 5_000);
    visitor_a.unread = 1;
    records.push(visitor_a);

    let mut visitor_b = Conversation::new("visitor-0990", ConversationKind::Omnichannel, 4_500);
    visitor_b.on_hold = true;
    records.push(visitor_b);

    // invisible seeds: one archived, one closed
    let mut old_town = Conversation::new("old-town", ConversationKind::PublicChannel, 4_000);
    old_town.archived = true;
    records.push(old_town);
    let mut parked = Conversation::new("parked-dm", ConversationKind::Direct, 3_500);
    parked.open = false;
    records.push(parked);

    records
}

fn kind_tag(kind: ConversationKind) -> &'static str {
    match kind {
        ConversationKind::Direct => "dm",
        ConversationKind::PublicChannel => "pub",
        ConversationKind::PrivateChannel => "priv",
        ConversationKind::Team => "team",
        ConversationKind::Discussion => "disc",
        ConversationKind::Omnichannel => "omni",
    }
}

fn parse_kind(tag: &str) -> Option<ConversationKind> {
    Some(match tag {
        "dm" => ConversationKind::Direct,
        "pub" => ConversationKind::PublicChannel,
        "priv" => ConversationKind::PrivateChannel,
        "team" => ConversationKind::Team,
        "disc" => ConversationKind::Discussion,
        "omni" => ConversationKind::Omnichannel,
        _ => return None,
    })
}

fn print_view(state: &ViewState) {
    println!();
    match &state.phase {
        ViewPhase::Loading => println!("-- loading --"),
        ViewPhase::Failed(reason) => println!("-- failed: {reason} --"),
        ViewPhase::Live => {}
    }
    for row in &state.rows {
        match row {
            ViewRow::Section(label) => println!("── {} ──", label.as_str()),
            ViewRow::Conversation(c) => println!(
                " {}{} {:<16} [{}]",
                if c.favorite { "★" } else { " " },
                if c.is_unread() { "●" } else { " " },
                c.title(true),
                kind_tag(c.kind),
            ),
        }
    }
    println!("({} rows)", state.rows.len());
}

fn print_help() {
    println!("view unread|favorites|types|agent|realnames  toggle a criteria flag");
    println!("sort                toggle recency/alphabetical");
    println!("more                grow the pagination window");
    println!("/<text>             search; esc cancels");
    println!("fav|unfav <id>      favorite actions");
    println!("read|markunread <id>  read-status actions");
    println!("hide <id>           hide a conversation");
    println!("touch <id>          bump a record's activity");
    println!("add <id> [kind]     insert a record (dm|pub|priv|team|disc|omni)");
    println!("dump                print the rows as JSON");
    println!("quit");
}

async fn run_action(label: &str, action: impl std::future::Future<Output = Result<(), roomlist_core::ServiceError>>) {
    if let Err(err) = action.await {
        println!("{label} failed: {err}");
    }
}

async fn dispatch(
    line: &str,
    handle: &ListHandle,
    store: &MemoryStore,
    criteria: &mut QueryCriteria,
    clock: &mut u64,
) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    match (command, parts.next()) {
        ("quit", _) | ("q", _) => return false,
        ("help", _) => print_help(),
        ("view", Some(flag)) => {
            match flag {
                "unread" => criteria.show_unread = !criteria.show_unread,
                "favorites" => criteria.show_favorites = !criteria.show_favorites,
                "types" => criteria.group_by_type = !criteria.group_by_type,
                "agent" => criteria.omnichannel_agent = !criteria.omnichannel_agent,
                "realnames" => criteria.real_name_sort = !criteria.real_name_sort,
                other => {
                    println!("unknown flag: {other}");
                    return true;
                }
            }
            handle.set_criteria(*criteria);
        }
        ("sort", _) => {
            criteria.sort_key = match criteria.sort_key {
                SortKey::Recency => SortKey::Alphabetical,
                SortKey::Alphabetical => SortKey::Recency,
            };
            handle.set_criteria(*criteria);
        }
        ("more", _) => handle.load_more(),
        ("esc", _) => handle.cancel_search(),
        ("fav", Some(id)) => run_action("fav", handle.toggle_favorite(id, true)).await,
        ("unfav", Some(id)) => run_action("unfav", handle.toggle_favorite(id, false)).await,
        ("read", Some(id)) => run_action("read", handle.toggle_read(id, false, true)).await,
        ("markunread", Some(id)) => run_action("markunread", handle.toggle_read(id, true, false)).await,
        ("hide", Some(id)) => {
            let Some(kind) = store.records().iter().find(|c| c.id == id).map(|c| c.kind) else {
                println!("unknown id: {id}");
                return true;
            };
            run_action("hide", handle.hide(id, kind)).await;
        }
        ("touch", Some(id)) => {
            *clock += 100;
            if let Err(err) = store.touch(id, *clock) {
                println!("touch failed: {err}");
            }
        }
        ("add", Some(id)) => {
            let kind = parts
                .next()
                .and_then(parse_kind)
                .unwrap_or(ConversationKind::PublicChannel);
            *clock += 100;
            store.upsert(Conversation::new(id, kind, *clock));
        }
        ("dump", _) => {
            let state = handle.view_state();
            match serde_json::to_string_pretty(&state.rows) {
                Ok(json) => println!("{json}"),
                Err(err) => warn!(%err, "failed to serialize rows"),
            }
        }
        _ => println!("unrecognized: {line} (try help)"),
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref());

    let store = Arc::new(MemoryStore::with_records(seed()));
    let service = Arc::new(LoopbackChatService::new(store.clone()));
    let config = ListConfig::new(args.page_size, Duration::from_millis(args.debounce_ms));
    let (runtime, handle) = ListRuntime::spawn(store.clone(), service, config);

    let mut criteria = QueryCriteria::default();
    handle.set_criteria(criteria);

    let mut view = handle.view();
    let printer = tokio::spawn(async move {
        while view.changed().await.is_ok() {
            let state = view.borrow_and_update().clone();
            print_view(&state);
        }
    });

    print_help();
    let mut clock: u64 = 10_000;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if let Some(text) = line.strip_prefix('/') {
            handle.search(text);
            continue;
        }
        if !dispatch(line, &handle, &store, &mut criteria, &mut clock).await {
            break;
        }
    }

    runtime.shutdown().await;
    printer.abort();
    Ok(())
}
