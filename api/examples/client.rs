//! Posts a PDF and a questions file to a running server and prints the answers.
//!
//! cargo run -p zania_api --example client -- document.pdf questions.json

use reqwest::multipart::{Form, Part};
use reqwest::Client;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let document = args.next().ok_or("usage: client <document.pdf> <questions.json>")?;
    let questions = args.next().ok_or("usage: client <document.pdf> <questions.json>")?;
    let base_url = std::env::var("ZANIA_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());

    let client = Client::new();

    println!("Health Check:");
    let health = client.get(format!("{}/health", base_url)).send().await?;
    println!("Status: {}", health.status());
    let health_json: serde_json::Value = health.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&health_json)?);

    let form = Form::new()
        .part(
            "questions",
            Part::bytes(tokio::fs::read(&questions).await?)
                .file_name("questions.json")
                .mime_str("application/json")?,
        )
        .part(
            "data",
            Part::bytes(tokio::fs::read(&document).await?)
                .file_name("document.pdf")
                .mime_str("application/pdf")?,
        );

    println!("\nAsking questions from {}:", questions);
    let response = client
        .post(format!("{}/zania/chat", base_url))
        .multipart(form)
        .send()
        .await?;

    println!("Status: {}", response.status());
    let answers: serde_json::Value = response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&answers)?);

    Ok(())
}
