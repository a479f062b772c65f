//! Streaming Gemini example.
//!
//! Run with:
//! ```bash
//! export GEMINI_API_KEY="your-api-key"
//! cargo run --example gemini_streaming
//! ```

use std::io::Write;

use futures::StreamExt;
use gemini_sdk::model::GenerationConfig;
use gemini_sdk::GeminiClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = GeminiClient::from_env()?;

    let config = GenerationConfig::new()
        .with_temperature(0.9)
        .with_top_p(0.95)
        .with_max_output_tokens(1024);

    println!("Streaming response from Gemini...\n");

    let mut stream = client
        .stream_text_prompt_with("Write a haiku about Rust programming.", Some(config), Vec::new())
        .await?;

    print!("Response: ");

    while let Some(chunk_result) = stream.next().await {
        match chunk_result {
            Ok(chunk) => {
                // Print text as it arrives
                if let Some(text) = chunk.text() {
                    print!("{}", text);
                }
                std::io::stdout().flush()?;

                if let Some(usage) = chunk.usage_metadata {
                    println!("\n\n=== Usage Information ===");
                    if let Some(total) = usage.total_token_count {
                        println!("Total tokens: {}", total);
                    }
                }
            }
            Err(e) => {
                eprintln!("\nError in stream: {}", e);
                return Err(e.into());
            }
        }
    }

    println!("\n\n=== Stream Complete ===");
    Ok(())
}
