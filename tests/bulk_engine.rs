use serde_json::{json, Value};
use showcase_db::logic::{BulkOptions, BulkPatch, BulkUpsert, DeadlineExceeded, HookContext};
use showcase_db::model::{BatchOutcome, EntityKind, LiveConflictPolicy};
use showcase_db::store::traits::{BulkWriteStore, ReferenceStore, Store};
use showcase_db::store::MemoryStore;
use showcase_db::{Projection, TableSpec, Uid, UpdatePlan, UpsertStatement, UpsertedRow, WrittenRow};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// A small catalogue shared by most tests: one brand, one studio room, two
// platforms, a reviewer and two shows.
struct Fixture {
    store: MemoryStore,
}

impl Fixture {
    fn new() -> Self {
        let store = MemoryStore::new();
        let brand = store.seed(EntityKind::Brand, "brand_acme", json!({"name": "Acme"}));
        let studio = store.seed(EntityKind::Studio, "studio_hq", json!({"name": "HQ"}));
        let room = store.seed(
            EntityKind::StudioRoom,
            "studio_room_a",
            json!({"studio_id": studio, "name": "A", "capacity": 10}),
        );
        store.seed(EntityKind::Platform, "platform_x", json!({"name": "X"}));
        store.seed(EntityKind::Platform, "platform_y", json!({"name": "Y"}));
        store.seed(EntityKind::User, "user_rev", json!({"email": "rev@example.com"}));
        store.seed(
            EntityKind::Show,
            "show_a",
            json!({"brand_id": brand, "studio_room_id": room, "name": "Morning", "start_time": "2024-01-01T08:00:00+00:00"}),
        );
        store.seed(
            EntityKind::Show,
            "show_b",
            json!({"brand_id": brand, "name": "Evening", "start_time": "2024-01-01T18:00:00+00:00"}),
        );
        store.reset_stats();
        Self { store }
    }

    async fn upsert(&self, kind: EntityKind, records: Vec<Value>) -> BatchOutcome {
        self.upsert_with(kind, records, &BulkOptions::default()).await
    }

    async fn upsert_with(&self, kind: EntityKind, records: Vec<Value>, options: &BulkOptions) -> BatchOutcome {
        BulkUpsert::run(&self.store, kind, records, options)
            .await
            .expect("upsert should not fail")
    }

    async fn patch(&self, kind: EntityKind, records: Vec<Value>) -> BatchOutcome {
        BulkPatch::run(&self.store, kind, records, &BulkOptions::default())
            .await
            .expect("patch should not fail")
    }

    fn field(&self, kind: EntityKind, uid: &str, column: &str) -> Value {
        self.store
            .row(kind, uid)
            .and_then(|row| row.get(column).cloned())
            .unwrap_or(Value::Null)
    }
}

fn assert_no_surrogate_keys(outcome: &BatchOutcome) {
    for record in &outcome.records {
        let fields = record.as_object().expect("records are objects");
        assert!(!fields.contains_key("id"), "surrogate key leaked: {record}");
        assert!(
            !fields.keys().any(|key| key.ends_with("_id")),
            "surrogate reference leaked: {record}"
        );
    }
}

#[tokio::test]
async fn test_upsert_keeps_valid_records_and_reports_missing_references() {
    let fx = Fixture::new();
    let good = json!({"show": "show_a", "platform": "platform_x", "live_url": "https://x/acme"});
    let bad = json!({"show": "show_a", "platform": "platform_does_not_exist"});

    let outcome = fx.upsert(EntityKind::ShowPlatform, vec![good, bad.clone()]).await;

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0]["live_url"], json!("https://x/acme"));
    assert_eq!(outcome.records[0]["show"], json!("show_a"));
    assert_eq!(outcome.records[0]["platform"], json!("platform_x"));
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].message, "platform not found");
    assert_eq!(outcome.errors[0].payload, bad);
    assert_eq!(fx.store.rows(EntityKind::ShowPlatform).len(), 1);
    assert_no_surrogate_keys(&outcome);
}

#[tokio::test]
async fn test_every_input_is_accounted_for() {
    let fx = Fixture::new();
    fx.store.seed(EntityKind::Material, "material_old", json!({"brand_id": 1, "name": "Deck"}));

    let records = vec![
        json!({"brand": "brand_acme", "name": "Deck"}),
        json!({"brand": "brand_acme", "name": "Video"}),
        json!({"brand": "brand_gone", "name": "Orphan"}),
        json!({"brand": "brand_acme"}),
        json!("not an object"),
        json!({"brand": "brand_acme", "name": "Video"}),
        json!({"brand": "brand_acme", "name": "Photo", "colour": "red"}),
    ];
    let total = records.len();

    let outcome = fx.upsert(EntityKind::Material, records).await;

    assert_eq!(outcome.len(), total);
    assert_eq!(outcome.records.len(), 1);
    let messages: Vec<&str> = outcome.errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "material already exists",
            "brand not found",
            "name is required",
            "record must be a JSON object",
            "duplicate material in batch",
            "unknown field 'colour'",
        ]
    );
}

#[tokio::test]
async fn test_no_errors_when_everything_resolves() {
    let fx = Fixture::new();
    let outcome = fx
        .upsert(
            EntityKind::ShowPlatform,
            vec![
                json!({"show": "show_a", "platform": "platform_x", "reviewer": "user_rev"}),
                json!({"show": "show_a", "platform": "platform_y"}),
                json!({"show": "show_b", "platform": "platform_x", "viewer_count": 1200}),
            ],
        )
        .await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.records[0]["reviewer"], json!("user_rev"));
    assert_eq!(outcome.records[2]["viewer_count"], json!(1200));
    assert_eq!(outcome.records[1]["status"], json!("pending"));
    for record in &outcome.records {
        assert!(record["uid"].as_str().unwrap().starts_with("show_platform_"));
    }
}

#[tokio::test]
async fn test_optional_reference_is_left_unset() {
    let fx = Fixture::new();
    let outcome = fx
        .upsert(
            EntityKind::Show,
            vec![json!({"brand": "brand_acme", "name": "Pop-up"})],
        )
        .await;

    assert!(outcome.is_complete());
    assert!(outcome.records[0]["studio_room"].is_null());
    let uid = outcome.records[0]["uid"].as_str().unwrap();
    assert!(fx.field(EntityKind::Show, uid, "studio_room_id").is_null());
}

#[tokio::test]
async fn test_one_lookup_per_kind_regardless_of_repeats() {
    let fx = Fixture::new();
    let records: Vec<Value> = (0..20)
        .map(|i| {
            json!({
                "show": if i % 2 == 0 { "show_a" } else { "show_b" },
                "platform": "platform_x",
                "reviewer": "user_rev",
                "live_url": format!("https://x/{i}"),
            })
        })
        .collect();

    fx.upsert(EntityKind::ShowPlatform, records).await;

    let stats = fx.store.stats();
    assert_eq!(stats.lookups.len(), 3);
    assert_eq!(stats.lookups_for(EntityKind::Show), 1);
    let show_lookup = stats
        .lookups
        .iter()
        .find(|(kind, _)| *kind == EntityKind::Show)
        .unwrap();
    assert_eq!(show_lookup.1.len(), 2);
    assert_eq!(stats.upsert_statements, 1);
}

#[tokio::test]
async fn test_soft_deleted_natural_key_is_resurrected() {
    let fx = Fixture::new();
    let id = fx.store.seed(
        EntityKind::Platform,
        "platform_old",
        json!({"name": "Kick", "url": "https://old"}),
    );
    fx.store.soft_delete(EntityKind::Platform, "platform_old");

    let outcome = fx
        .upsert(EntityKind::Platform, vec![json!({"name": "Kick", "url": "https://kick.com"})])
        .await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.records[0]["uid"], json!("platform_old"));
    assert_eq!(outcome.records[0]["url"], json!("https://kick.com"));
    assert!(outcome.records[0]["deleted_at"].is_null());

    let kicks: Vec<_> = fx
        .store
        .rows(EntityKind::Platform)
        .into_iter()
        .filter(|row| row["name"] == json!("Kick"))
        .collect();
    assert_eq!(kicks.len(), 1);
    assert_eq!(kicks[0]["id"], json!(id));
}

#[tokio::test]
async fn test_platforms_default_to_active_and_can_be_switched_off() {
    let fx = Fixture::new();

    let outcome = fx
        .upsert(
            EntityKind::Platform,
            vec![json!({"name": "Kick"}), json!({"name": "Vimeo", "is_active": "yes"})],
        )
        .await;
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0]["is_active"], json!(true));
    assert_eq!(outcome.errors[0].message, "invalid value for 'is_active'");

    let kick = outcome.records[0]["uid"].as_str().unwrap().to_string();
    let patched = fx
        .patch(EntityKind::Platform, vec![json!({"uid": kick, "is_active": false})])
        .await;
    assert!(patched.is_complete());
    assert_eq!(patched.records[0]["is_active"], json!(false));
    assert_eq!(fx.field(EntityKind::Platform, &kick, "is_active"), json!(false));
}

#[tokio::test]
async fn test_live_natural_key_conflict_is_rejected_by_default() {
    let fx = Fixture::new();
    let payload = json!({"name": "X", "url": "https://changed"});

    let outcome = fx.upsert(EntityKind::Platform, vec![payload.clone()]).await;

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.errors[0].message, "platform already exists");
    assert_eq!(outcome.errors[0].payload, payload);
    assert!(fx.field(EntityKind::Platform, "platform_x", "url").is_null());
}

#[tokio::test]
async fn test_live_natural_key_conflict_merges_when_asked() {
    let fx = Fixture::new();
    let options = BulkOptions::default().with_live_conflict(LiveConflictPolicy::Merge);

    let outcome = fx
        .upsert_with(
            EntityKind::Platform,
            vec![json!({"name": "X", "url": "https://changed"})],
            &options,
        )
        .await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.records[0]["uid"], json!("platform_x"));
    assert_eq!(fx.field(EntityKind::Platform, "platform_x", "url"), json!("https://changed"));
}

#[tokio::test]
async fn test_patch_applies_each_rows_own_fields_in_one_statement() {
    let fx = Fixture::new();

    let outcome = fx
        .patch(
            EntityKind::Show,
            vec![
                json!({"uid": "show_a", "name": "Keynote"}),
                json!({"uid": "show_b", "start_time": "2024-01-01T10:00:00Z"}),
            ],
        )
        .await;

    assert!(outcome.is_complete());
    assert_eq!(fx.store.stats().update_statements, 1);

    assert_eq!(fx.field(EntityKind::Show, "show_a", "name"), json!("Keynote"));
    assert_eq!(
        fx.field(EntityKind::Show, "show_a", "start_time"),
        json!("2024-01-01T08:00:00+00:00")
    );
    assert_eq!(fx.field(EntityKind::Show, "show_b", "name"), json!("Evening"));
    assert_eq!(
        fx.field(EntityKind::Show, "show_b", "start_time"),
        json!("2024-01-01T10:00:00+00:00")
    );

    assert_eq!(outcome.records[0]["uid"], json!("show_a"));
    assert_eq!(outcome.records[1]["start_time"], json!("2024-01-01T10:00:00+00:00"));
    // untouched references still come back as identifiers
    assert_eq!(outcome.records[0]["brand"], json!("brand_acme"));
    assert_eq!(outcome.records[0]["studio_room"], json!("studio_room_a"));
    assert_no_surrogate_keys(&outcome);
}

#[tokio::test]
async fn test_patch_many_rows_is_still_one_update() {
    let fx = Fixture::new();
    let mut records = Vec::new();
    for i in 0..25 {
        let (_, uid) = fx.store.seed_new(EntityKind::Show, json!({"brand_id": 1, "name": format!("Show {i}")}));
        records.push(if i % 3 == 0 {
            json!({"uid": uid, "status": "live"})
        } else {
            json!({"uid": uid, "name": format!("Renamed {i}")})
        });
    }

    let outcome = fx.patch(EntityKind::Show, records).await;

    assert_eq!(outcome.records.len(), 25);
    assert_eq!(fx.store.stats().update_statements, 1);
    assert_eq!(outcome.records[0]["status"], json!("live"));
    assert_eq!(outcome.records[0]["name"], json!("Show 0"));
    assert_eq!(outcome.records[1]["status"], json!("draft"));
    assert_eq!(outcome.records[1]["name"], json!("Renamed 1"));
}

#[tokio::test]
async fn test_patch_reports_missing_targets_and_references() {
    let fx = Fixture::new();
    fx.store.soft_delete(EntityKind::Show, "show_b");

    let outcome = fx
        .patch(
            EntityKind::Show,
            vec![
                json!({"uid": "show_a", "studio_room": "studio_room_nope"}),
                json!({"uid": "show_b", "name": "Deleted"}),
                json!({"uid": "show_zzz", "name": "Ghost"}),
                json!({"name": "No target"}),
                json!({"uid": "show_a", "status": "live"}),
            ],
        )
        .await;

    assert_eq!(outcome.len(), 5);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0]["status"], json!("live"));
    let messages: Vec<&str> = outcome.errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["studio_room not found", "show not found", "show not found", "uid is required"]
    );
    assert_eq!(fx.field(EntityKind::Show, "show_b", "name"), json!("Evening"));
}

#[tokio::test]
async fn test_patch_can_move_and_clear_references() {
    let fx = Fixture::new();

    let outcome = fx.patch(EntityKind::ShowPlatform, Vec::new()).await;
    assert!(outcome.is_empty());

    let created = fx
        .upsert(
            EntityKind::ShowPlatform,
            vec![json!({"show": "show_a", "platform": "platform_x", "reviewer": "user_rev"})],
        )
        .await;
    let uid = created.records[0]["uid"].as_str().unwrap().to_string();

    let cleared = fx
        .patch(EntityKind::ShowPlatform, vec![json!({"uid": uid, "reviewer": null})])
        .await;
    assert!(cleared.is_complete());
    assert!(cleared.records[0]["reviewer"].is_null());
    assert_eq!(cleared.records[0]["platform"], json!("platform_x"));
}

#[tokio::test]
async fn test_store_failure_is_fatal_for_the_batch() {
    let fx = Fixture::new();
    fx.store.fail_writes(true);

    let result = BulkUpsert::run(
        &fx.store,
        EntityKind::Platform,
        vec![json!({"name": "New"}), json!({"name": "Newer"})],
        &BulkOptions::default(),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(fx.store.rows(EntityKind::Platform).len(), 2);

    let result = BulkPatch::run(
        &fx.store,
        EntityKind::Show,
        vec![json!({"uid": "show_a", "name": "Never"})],
        &BulkOptions::default(),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(fx.field(EntityKind::Show, "show_a", "name"), json!("Morning"));
}

fn large_rooms_only(ctx: &HookContext<'_>) -> Result<(), String> {
    let room = ctx.referenced("studio_room_id", EntityKind::StudioRoom);
    match room.and_then(|room| room.attributes.get("capacity")?.as_i64()) {
        Some(capacity) if capacity < 50 => Err(format!("studio room holds only {capacity}")),
        _ => Ok(()),
    }
}

fn ends_after_start(ctx: &HookContext<'_>) -> Result<(), String> {
    let Some(target) = ctx.target else {
        return Err("patch without target".to_string());
    };
    match (target.attributes.get("start_time"), ctx.values.get("end_time")) {
        (Some(Value::String(start)), Some(Value::String(end))) if end <= start => {
            Err("show must end after it starts".to_string())
        }
        _ => Ok(()),
    }
}

#[tokio::test]
async fn test_hook_rejects_records_with_its_message() {
    let fx = Fixture::new();
    let options = BulkOptions::default().with_hook(large_rooms_only);

    let outcome = fx
        .upsert_with(
            EntityKind::Show,
            vec![
                json!({"brand": "brand_acme", "studio_room": "studio_room_a", "name": "Big"}),
                json!({"brand": "brand_acme", "name": "Remote"}),
            ],
            &options,
        )
        .await;

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0]["name"], json!("Remote"));
    assert_eq!(outcome.errors[0].message, "studio room holds only 10");
}

#[tokio::test]
async fn test_patch_hook_sees_the_target() {
    let fx = Fixture::new();
    let options = BulkOptions::default().with_hook(ends_after_start);

    let outcome = BulkPatch::run(
        &fx.store,
        EntityKind::Show,
        vec![
            json!({"uid": "show_a", "end_time": "2024-01-01T07:00:00Z"}),
            json!({"uid": "show_b", "end_time": "2024-01-01T20:00:00Z"}),
        ],
        &options,
    )
    .await
    .unwrap();

    assert_eq!(outcome.errors[0].message, "show must end after it starts");
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0]["uid"], json!("show_b"));
}

// Delegates to a MemoryStore but stalls every lookup.
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait::async_trait]
impl ReferenceStore for SlowStore {
    async fn fetch_live(&self, spec: &'static TableSpec, uids: &[Uid]) -> anyhow::Result<Vec<Projection>> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_live(spec, uids).await
    }
}

#[async_trait::async_trait]
impl BulkWriteStore for SlowStore {
    async fn execute_upsert(&self, statement: &UpsertStatement) -> anyhow::Result<Vec<UpsertedRow>> {
        self.inner.execute_upsert(statement).await
    }

    async fn execute_update(&self, plan: &UpdatePlan) -> anyhow::Result<Vec<WrittenRow>> {
        self.inner.execute_update(plan).await
    }
}

impl Store for SlowStore {}

// Delegates to a MemoryStore; every read after the first committed write
// fails, as it would when the connection drops right after a commit.
struct ReadsFailAfterWrite {
    inner: MemoryStore,
    written: AtomicBool,
}

impl ReadsFailAfterWrite {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            written: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl ReferenceStore for ReadsFailAfterWrite {
    async fn fetch_live(&self, spec: &'static TableSpec, uids: &[Uid]) -> anyhow::Result<Vec<Projection>> {
        if self.written.load(Ordering::SeqCst) {
            anyhow::bail!("connection lost reading {}", spec.table);
        }
        self.inner.fetch_live(spec, uids).await
    }
}

#[async_trait::async_trait]
impl BulkWriteStore for ReadsFailAfterWrite {
    async fn execute_upsert(&self, statement: &UpsertStatement) -> anyhow::Result<Vec<UpsertedRow>> {
        let upserted = self.inner.execute_upsert(statement).await?;
        self.written.store(true, Ordering::SeqCst);
        Ok(upserted)
    }

    async fn execute_update(&self, plan: &UpdatePlan) -> anyhow::Result<Vec<WrittenRow>> {
        let updated = self.inner.execute_update(plan).await?;
        self.written.store(true, Ordering::SeqCst);
        Ok(updated)
    }
}

impl Store for ReadsFailAfterWrite {}

#[tokio::test]
async fn test_committed_patch_is_reported_without_further_reads() {
    let store = ReadsFailAfterWrite::new(Fixture::new().store);

    // brand and studio_room are untouched, so their uids are not part of
    // the batch's resolution.
    let outcome = BulkPatch::run(
        &store,
        EntityKind::Show,
        vec![json!({"uid": "show_a", "name": "Renamed"})],
        &BulkOptions::default(),
    )
    .await
    .expect("a committed patch is reported as written");

    assert!(outcome.is_complete());
    assert_eq!(outcome.records[0]["name"], json!("Renamed"));
    assert_eq!(outcome.records[0]["brand"], json!("brand_acme"));
    assert_eq!(outcome.records[0]["studio_room"], json!("studio_room_a"));
    assert_no_surrogate_keys(&outcome);

    let stored = store.inner.row(EntityKind::Show, "show_a").unwrap();
    assert_eq!(stored["name"], json!("Renamed"));
    assert_eq!(store.inner.stats().lookups.len(), 1);
}

#[tokio::test]
async fn test_committed_upsert_is_reported_without_further_reads() {
    let store = ReadsFailAfterWrite::new(Fixture::new().store);
    let options = BulkOptions::default().with_live_conflict(LiveConflictPolicy::Merge);

    let outcome = BulkUpsert::run(
        &store,
        EntityKind::StudioRoom,
        vec![
            json!({"studio": "studio_hq", "name": "A", "capacity": 12}),
            json!({"studio": "studio_hq", "name": "B"}),
        ],
        &options,
    )
    .await
    .expect("a committed upsert is reported as written");

    assert!(outcome.is_complete());
    assert_eq!(outcome.records[0]["uid"], json!("studio_room_a"));
    assert_eq!(outcome.records[0]["capacity"], json!(12));
    assert!(outcome.records.iter().all(|r| r["studio"] == json!("studio_hq")));
    assert!(store.written.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_deadline_aborts_a_stalled_batch() {
    let store = SlowStore {
        inner: MemoryStore::new(),
        delay: Duration::from_secs(10),
    };
    store.inner.seed(EntityKind::Brand, "brand_acme", json!({"name": "Acme"}));

    let options = BulkOptions::default().with_deadline(Duration::from_millis(20));
    let err = BulkUpsert::run(
        &store,
        EntityKind::Material,
        vec![json!({"brand": "brand_acme", "name": "Deck"})],
        &options,
    )
    .await
    .unwrap_err();

    let deadline = err.downcast_ref::<DeadlineExceeded>().expect("deadline error");
    assert_eq!(deadline.stage, "reference resolution");
    assert_eq!(store.inner.stats().upsert_statements, 0);
}

#[tokio::test]
async fn test_store_is_usable_as_trait_object() {
    let fx = Fixture::new();
    let store: &dyn Store = &fx.store;

    let outcome = BulkUpsert::run(
        store,
        EntityKind::User,
        vec![json!({"email": "new@example.com", "name": "New"})],
        &BulkOptions::default(),
    )
    .await
    .unwrap();

    assert!(outcome.is_complete());
    assert!(outcome.records[0]["uid"].as_str().unwrap().starts_with("user_"));
}
