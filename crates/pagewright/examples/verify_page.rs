//! Example: Verifying a Page Object
//!
//! Demonstrates: schema declaration, waiting for a slow page, load
//! verification and failure reports, all against the in-memory mock driver.
//!
//! Run with: `cargo run --example verify_page`

use pagewright::mock::{MockDriver, MockElement};
use pagewright::prelude::*;

fn main() -> PageResult<()> {
    let config = Config::new()
        .with_log_level(LogLevel::Info)
        .with_poll_interval(Duration::from_millis(20))
        .with_env_overrides()?;
    let _ = pagewright::logging::install(&config)?;

    println!("=== Page Verification Example ===\n");

    // 1. Declare schemas
    println!("1. Declaring schemas...");
    let mut registry = SchemaRegistry::new();
    let form = registry.register(
        "LoginForm",
        SchemaBuilder::new()
            .element("user", "#user")
            .element("password", "#password")
            .element("submit", SelectorSpec::builder("button").text("Sign in"))
            .expected(["user", "password", "submit"]),
    )?;
    let home = registry.register(
        "Home",
        SchemaBuilder::new()
            .element("title", ".title")
            .section("login", form, "#login")
            .elements("links", SelectorSpec::builder("nav a").between(2..=5))
            .element("spinner", ".spinner")
            .expected(["title", "login", "links"])
            .invisible(["spinner"]),
    )?;
    let schemas = registry.freeze()?;
    for schema in schemas.iter() {
        println!("   {} ({} nodes)", schema.name(), schema.len());
    }

    // 2. A page that renders slowly
    println!("\n2. Scripting a slow page...");
    let driver = MockDriver::new()
        .with_element(MockElement::new(".title").appearing_after(Duration::from_millis(300)))
        .with_element(
            MockElement::new("#login")
                .with_child(MockElement::new("#user"))
                .with_child(MockElement::new("#password"))
                .with_child(MockElement::new("button").with_text("Sign in")),
        )
        .with_elements("nav a", 3)
        .with_element(MockElement::new(".spinner").disappearing_after(Duration::from_millis(200)));

    let mut page = Page::new(&driver, schemas, home, config)?;

    // 3. Too short a budget
    println!("\n3. Verifying with a 100ms budget...");
    match page.verify_loaded(Some(Duration::from_millis(100))) {
        Ok(()) => println!("   loaded"),
        Err(err) => {
            println!("   {err}");
            if let Some(report) = err.report() {
                print!("{}", report.render_tree());
            }
        }
    }
    println!("   state: {}", page.load_state());

    // 4. Enough time
    println!("\n4. Verifying with a 1s budget...");
    page.verify_loaded(Some(Duration::from_secs(1)))?;
    println!("   state: {}", page.load_state());
    println!("   present: {:?}", page.present_expected(None)?);

    // 5. Single-node checks
    println!("\n5. Single-node checks...");
    println!("   title present: {}", page.check_present("title", Wait::Immediate)?);
    println!("   spinner absent: {}", page.check_absent("spinner", Wait::Immediate)?);
    println!("   links: {}", page.count("links")?);
    println!("   queries issued: {}", driver.queries().len());

    Ok(())
}
