use rulekit::{DataContext, MemoryRuleStore, RuleEngine};

fn main() {
    let engine = RuleEngine::new(MemoryRuleStore::new());
    let a = engine.create_rule("age >= 18").expect("failed to create rule");
    let b = engine
        .create_rule("status = 'active'")
        .expect("failed to create rule");
    engine
        .combine_rules(&[a.id, b.id])
        .expect("failed to combine rules");

    let path = std::env::temp_dir().join("rulekit_demo.rkit");
    engine
        .store()
        .to_file(&path)
        .expect("failed to write snapshot");
    println!("Wrote {} rules to {}", engine.store().len(), path.display());

    let restored =
        RuleEngine::new(MemoryRuleStore::from_file(&path).expect("failed to read snapshot"));
    let ctx = DataContext::new().set("age", 30).set("status", "active");
    println!(
        "Restored {} rules, eligible = {}",
        restored.store().len(),
        restored.evaluate(&ctx).expect("evaluation failed")
    );

    let next = restored
        .create_rule("score > 10")
        .expect("failed to create rule");
    println!(
        "Next rule continues at sequence number {:?}",
        next.sequence_number
    );

    std::fs::remove_file(&path).ok();
}
