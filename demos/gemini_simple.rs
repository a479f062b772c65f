//! Simple Gemini example: a single prompt, a multi-turn conversation and a
//! token count.
//!
//! Run with:
//! ```bash
//! export GEMINI_API_KEY="your-api-key"
//! cargo run --example gemini_simple
//! ```

use gemini_sdk::model::{Content, GenerationConfig, Part, SafetySetting};
use gemini_sdk::GeminiClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Reads GEMINI_API_KEY and any base URL overrides
    let client = GeminiClient::from_env()?;

    println!("Sending request to Gemini...");

    match client
        .text_prompt("What is the capital of France? Answer in one word.")
        .await
    {
        Ok(response) => {
            println!("\n=== Response ===");
            println!("{}", response.text().unwrap_or_default());

            for candidate in &response.candidates {
                println!("Finish reason: {:?}", candidate.finish_reason);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(e.into());
        }
    }

    println!("\n\n=== Multi-turn conversation ===");

    let conversation = vec![
        Content::user(vec![Part::text("My name is Alice.")]),
        Content::model(vec![Part::text("Nice to meet you, Alice!")]),
        Content::user(vec![Part::text("What is my name?")]),
    ];

    let response = client
        .text_prompt_with(
            conversation.clone(),
            Some(GenerationConfig::new().with_temperature(0.2).with_max_output_tokens(50)),
            vec![SafetySetting::new(
                "HARM_CATEGORY_HARASSMENT",
                "BLOCK_MEDIUM_AND_ABOVE",
            )],
        )
        .await?;
    println!("{}", response.text().unwrap_or_default());

    let tokens = client.count_tokens(conversation).await?;
    println!("\nConversation uses {} tokens", tokens.total_tokens);

    Ok(())
}
