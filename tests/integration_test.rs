// Integration tests for leadx
use async_trait::async_trait;
use leadx_campaign::{prepare_mailing, Campaign, CampaignStatus, Landingpage, NotificationLog};
use leadx_core::{
    compile, criteria, Collection, Condition, FilterClause, Operator, RecordStore, TypedValue,
};
use leadx_import::mapping;
use leadx_import::{
    prospect, DataSource, FetchResponse, HttpFetch, ImportReconciler, Pagination, SourceAdapter,
    SourceConfig,
};
use leadx_storage::StorageManager;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct ScriptedFetcher {
    responses: Mutex<VecDeque<FetchResponse>>,
    requests: Mutex<Vec<Vec<(String, String)>>>,
}

impl ScriptedFetcher {
    fn new(responses: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(FetchResponse::ok).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl HttpFetch for ScriptedFetcher {
    async fn get_json(
        &self,
        _url: &str,
        query: &[(String, String)],
    ) -> leadx_import::Result<FetchResponse> {
        self.requests.lock().unwrap().push(query.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| leadx_import::Error::Transport("script exhausted".to_string()))
    }
}

fn raw_user(id: &str, email: &str, gender: &str, age: i64, city: &str) -> Value {
    json!({
        "id": id,
        "firstName": "Test",
        "lastName": "User",
        "email": email,
        "phone": "+41 79 000 00 00",
        "gender": gender,
        "age": age,
        "birthDate": "1990-01-15",
        "image": "https://example.test/avatar.png",
        "bloodGroup": "A+",
        "height": 172.5,
        "weight": 68.0,
        "eyeColor": "Brown",
        "hair": {"color": "Black", "type": "Straight"},
        "address": {
            "address": "Bahnhofstrasse 1",
            "city": city,
            "state": "Zürich",
            "postalCode": "8001",
            "country": "Switzerland",
            "coordinates": {"lat": 47.37, "lng": 8.54}
        }
    })
}

/// ERP-shaped source whose results live under `results`
fn results_source(fetcher: &Arc<ScriptedFetcher>) -> SourceAdapter {
    let config = SourceConfig {
        source: DataSource::Erp,
        base_url: "https://erp.example.test/users".to_string(),
        results_key: "results",
        pagination: Pagination::Paged { limit: 50 },
        mapping: mapping::ERP,
    };
    SourceAdapter::new(config, fetcher.clone())
}

fn erp_source(fetcher: &Arc<ScriptedFetcher>) -> SourceAdapter {
    SourceAdapter::new(SourceConfig::erp("https://erp.example.test/users"), fetcher.clone())
}

fn raw(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_end_to_end_empty_fetch_keeps_records() {
    let collection = Collection::new(prospect::ENTITY);
    let reconciler = ImportReconciler::new(&collection);

    let fetcher = ScriptedFetcher::new(vec![json!({
        "results": [raw_user("1", "a@x.com", "female", 30, "Bern")],
        "total": 1
    })]);
    let summary = reconciler.run(&results_source(&fetcher)).await.unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(
        fetcher.requests.lock().unwrap()[0],
        vec![
            ("limit".to_string(), "50".to_string()),
            ("skip".to_string(), "0".to_string())
        ]
    );

    let fetcher = ScriptedFetcher::new(vec![json!({"results": [], "total": 0})]);
    let summary = reconciler.run(&results_source(&fetcher)).await.unwrap();
    assert_eq!(summary.pruned, 0);

    let record = collection
        .find_one_with_trashed(&Condition::eq("external_id", TypedValue::text("1")))
        .unwrap();
    assert!(!record.is_trashed());
    assert_eq!(record.get("email"), Some(&json!("a@x.com")));
}

#[tokio::test]
async fn test_two_sources_prune_independently() {
    let collection = Collection::new(prospect::ENTITY);
    let reconciler = ImportReconciler::new(&collection);

    let erp = ScriptedFetcher::new(vec![json!({
        "users": [
            raw_user("1", "a@x.com", "female", 30, "Bern"),
            raw_user("2", "b@x.com", "male", 41, "Zug")
        ],
        "total": 2
    })]);
    reconciler.run(&erp_source(&erp)).await.unwrap();

    let kueba = ScriptedFetcher::new(vec![json!({"results": [{
        "gender": "female",
        "name": {"first": "Lea", "last": "Keller"},
        "location": {
            "street": {"number": 3, "name": "Seestrasse"},
            "city": "Luzern", "state": "Luzern", "country": "Switzerland",
            "postcode": 6003,
            "coordinates": {"latitude": "47.05", "longitude": "8.30"}
        },
        "email": "lea@x.com",
        "login": {"uuid": "5b0b1b5c-6b2a-4b61-9f3e-1c2d3e4f5a6b"},
        "dob": {"date": "1988-03-04T10:00:00.000Z", "age": 36},
        "phone": "041 000 00 00",
        "picture": {"large": "https://example.test/lea.jpg"}
    }]})]);
    let adapter = SourceAdapter::new(SourceConfig::kueba("https://people.example.test/api"), kueba.clone());
    reconciler.run(&adapter).await.unwrap();
    assert_eq!(collection.count_live(), 3);

    // ERP drops user 2; the Küba prospect is untouched
    let erp = ScriptedFetcher::new(vec![json!({
        "users": [raw_user("1", "a@x.com", "female", 30, "Bern")],
        "total": 1
    })]);
    let summary = reconciler.run(&erp_source(&erp)).await.unwrap();
    assert_eq!(summary.pruned, 1);
    assert_eq!(collection.count_live(), 2);
    assert_eq!(
        collection.count(&vec![FilterClause::eq("source", TypedValue::text("kueba"))]),
        1
    );
}

#[test]
fn test_filter_properties() {
    let schema = prospect::schema();
    let casts = prospect::casts();

    assert!(compile(&schema, &raw(json!({"unknown_field": "x"})), &casts).is_empty());
    assert!(compile(&schema, &raw(json!({"min_source": "erp"})), &casts).is_empty());

    let clauses = compile(&schema, &raw(json!({"address_city": "Lucerne"})), &casts);
    assert_eq!(
        clauses,
        vec![FilterClause::new("address.city", Operator::Eq, TypedValue::text("Lucerne"))]
    );

    let clauses = compile(&schema, &raw(json!({"age_in": ["18", "25", "abc"]})), &casts);
    assert_eq!(
        clauses,
        vec![FilterClause::new(
            "age",
            Operator::In,
            TypedValue::List(vec![
                TypedValue::Integer(18),
                TypedValue::Integer(25),
                TypedValue::text("abc")
            ])
        )]
    );
}

#[tokio::test]
async fn test_import_persist_and_filter() {
    let dir = tempfile::tempdir().unwrap();
    {
        let storage = StorageManager::new(dir.path()).unwrap();
        let entity = storage
            .register_with_casts(prospect::ENTITY, prospect::schema(), prospect::casts())
            .unwrap();
        let collection: &Collection = entity.collection();
        let users: Vec<Value> = (0..12)
            .map(|i| {
                let gender = if i % 3 == 0 { "male" } else { "female" };
                raw_user(&i.to_string(), &format!("u{i}@x.com"), gender, 20 + i * 3, "Basel")
            })
            .collect();
        let fetcher = ScriptedFetcher::new(vec![json!({"users": users, "total": 12})]);
        ImportReconciler::new(collection).run(&erp_source(&fetcher)).await.unwrap();
        storage.save().unwrap();
    }

    let storage = StorageManager::new(dir.path()).unwrap();
    let entity = storage
        .register_with_casts(prospect::ENTITY, prospect::schema(), prospect::casts())
        .unwrap();

    let page = entity.filter_page(&raw(json!({"gender": "female", "max_age": "45"})), 1, 10);
    let ages: Vec<i64> = page.records.iter().filter_map(|r| r.get("age")?.as_i64()).collect();
    assert_eq!(ages, vec![23, 26, 32, 35, 41, 44]);
    assert_eq!(page.total, 6);

    let birth = entity.filter(&raw(json!({"min_birth_date": "1990-01-01", "max_birth_date": "1990-12-31"})));
    assert_eq!(birth.len(), 12);

    let a = serde_json::to_string(&entity.search_criteria()).unwrap();
    let b = serde_json::to_string(&entity.search_criteria()).unwrap();
    assert_eq!(a, b);
    let criteria: Value = serde_json::from_str(&a).unwrap();
    assert_eq!(criteria["age"], json!({"min": 20, "max": 53}));
    assert_eq!(criteria["address.city"], json!({"values": ["Basel"]}));
}

#[test]
fn test_criteria_over_projection() {
    let records = vec![
        json!({"source": "kueba", "age": 44}),
        json!({"source": "erp", "age": 19}),
        json!({"source": "", "age": null}),
    ];
    let schema = leadx_core::FieldSchema::new().enumeration("source").range("age");
    let built = criteria::build(&schema, &records);
    assert_eq!(
        serde_json::to_value(&built).unwrap(),
        json!({"age": {"min": 19, "max": 44}, "source": {"values": ["erp", "kueba"]}})
    );
}

#[tokio::test]
async fn test_campaign_mailing_over_imported_prospects() {
    let collection = Collection::new(prospect::ENTITY);
    let fetcher = ScriptedFetcher::new(vec![json!({
        "users": [
            raw_user("1", "a@x.com", "female", 30, "Bern"),
            raw_user("2", "b@x.com", "male", 41, "Zug"),
            raw_user("3", "c@x.com", "female", 52, "Zug")
        ],
        "total": 3
    })]);
    ImportReconciler::new(&collection).run(&erp_source(&fetcher)).await.unwrap();

    let mut campaign = Campaign::new("Zug Launch", "zug-launch");
    campaign.status = CampaignStatus::Active;
    campaign.landingpage = Some(Landingpage::new("Zug", "zug"));
    campaign.prospect_filter = Some(raw(json!({"address_city": "Zug", "gender": "female"})));

    let log = NotificationLog::new();
    let base = url::Url::parse("https://leads.example.test/api").unwrap();
    let summary = prepare_mailing(&campaign, &collection, &log, &base, false).unwrap();

    assert_eq!(summary.emails_sent, 1);
    assert_eq!(summary.mails[0].email, "c@x.com");
    assert!(summary.mails[0].tracking_url.contains("utm_campaign=Zug+Launch"));
}
