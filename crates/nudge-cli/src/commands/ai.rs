//! AI backend diagnostics

use anyhow::Result;
use nudge_core::ai::{AIBackend, AIClient, FinancialCoach, PlannedPurchase, Reflection};
use nudge_core::config::Config;
use nudge_core::models::Category;

/// Check the configured backend and run the coach prompts once
pub async fn cmd_ai_test(config: &Config, model: Option<&str>) -> Result<()> {
    println!("🔍 Testing AI backend...\n");
    println!("  Backend: {}", config.ai.backend_name());

    let Some(client) = AIClient::from_config(&config.ai) else {
        println!("  ❌ Not configured\n");
        println!("To set up an AI backend, either:");
        println!("  export GEMINI_API_KEY=<your key>");
        println!("or run a local model:");
        println!("  export AI_BACKEND=ollama OLLAMA_HOST=http://localhost:11434");
        return Ok(());
    };
    let client = match model {
        Some(m) => client.with_model(m),
        None => client,
    };

    println!("  Host:    {}", client.host());
    println!("  Model:   {}\n", client.model());

    print!("Checking availability... ");
    if client.health_check().await {
        println!("✅ Connected");
    } else {
        println!("❌ Failed");
        println!("\n⚠️  Could not reach {}", client.host());
        return Ok(());
    }

    let coach = FinancialCoach::new(client);
    let planned = PlannedPurchase {
        item: "Wireless earbuds".to_string(),
        amount: 129.0,
        category: Category::Shopping,
    };

    println!("\n📋 Reflection questions for \"{}\" (${:.2})...\n", planned.item, planned.amount);
    let questions = match coach.reflection_questions(&planned).await {
        Ok(q) => q,
        Err(e) => {
            println!("  ❌ Error: {}", e);
            return Ok(());
        }
    };
    for (i, q) in questions.as_slice().iter().enumerate() {
        println!("  {}. {}", i + 1, q);
    }

    let answers = [
        "I want them more than I need them",
        "My current pair still works",
        "I could wait for a sale",
    ];
    let reflections: Vec<Reflection> = questions
        .as_slice()
        .iter()
        .zip(answers)
        .map(|(q, a)| Reflection {
            question: q.clone(),
            answer: a.to_string(),
        })
        .collect();

    println!("\n⚖️  Verdict...\n");
    match coach.verdict(&planned, &reflections).await {
        Ok(v) => {
            println!("  {}", v.verdict);
            if let Some(s) = v.suggestion {
                println!("  {}", s);
            }
        }
        Err(e) => println!("  ❌ Error: {}", e),
    }

    println!("\n✅ AI test complete");
    Ok(())
}
