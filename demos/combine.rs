use std::sync::Arc;
use std::thread;

use rulekit::{EngineConfig, MemoryRuleStore, RuleEngine};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rulekit=info".into()),
        )
        .init();

    let config = EngineConfig::load(None).expect("failed to load configuration");
    let engine = Arc::new(RuleEngine::with_config(MemoryRuleStore::new(), config));

    let seniors = engine
        .create_rule("(age > 30 AND department = 'Sales') OR (age < 25 AND department = 'Marketing')")
        .expect("failed to create rule");
    let earners = engine
        .create_rule("salary > 50000 OR experience > 5")
        .expect("failed to create rule");
    let combined = engine
        .combine_rules(&[seniors.id, earners.id])
        .expect("failed to combine rules");

    println!("Combined rule #{}: {}", combined.id, combined.rule_text);

    let requests = [
        r#"{"age": 35, "department": "Sales", "salary": 60000, "experience": 3}"#,
        r#"{"age": 22, "department": "Marketing", "salary": 30000, "experience": 1}"#,
        r#"{"age": 22, "department": "Marketing", "experience": 7}"#,
        r#"["not", "an", "object"]"#,
    ];

    let handles: Vec<_> = requests
        .into_iter()
        .enumerate()
        .map(|(i, json)| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || match engine.evaluate_json(json) {
                Ok(eligible) => println!("Request {i}: eligible = {eligible}"),
                Err(err) => println!("Request {i}: rejected ({err})"),
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}
