use rulekit::{DataContext, evaluate, parse_rule};

fn main() {
    let rule = parse_rule("(age > 30 AND department = 'Sales') OR experience >= 10")
        .expect("failed to parse rule");

    println!("Rule: {rule}");
    println!("Attributes: {:?}", rule.attributes());

    let applicants = [
        ("Ana", DataContext::new().set("age", 35).set("department", "Sales")),
        ("Ben", DataContext::new().set("age", 28).set("experience", 12)),
        ("Cid", DataContext::new().set("age", 45).set("department", "HR")),
    ];

    for (name, ctx) in &applicants {
        println!("{name}: eligible = {}", evaluate(&rule, ctx));
    }

    match parse_rule("age > AND department = 'Sales'") {
        Ok(ast) => println!("Unexpectedly parsed: {ast}"),
        Err(err) => println!("Rejected: {} ({err})", err.user_message()),
    }
}
