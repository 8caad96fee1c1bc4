use std::time::Instant;

use emoheal::config::settings::Settings;
use emoheal::services::hosted::HostedClient;
use emoheal::services::ollama::OllamaClient;
use emoheal::services::provider::InferenceProvider;

const PROMPTS: [&str; 3] = [
    "hello",
    "I'm feeling overwhelmed today",
    "I hope things get better",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let providers: Vec<Box<dyn InferenceProvider>> = vec![
        Box::new(OllamaClient::from_settings(&settings)),
        Box::new(HostedClient::from_settings(&settings)),
    ];

    println!("\nProbing inference providers\n");

    for provider in &providers {
        if !provider.is_configured() {
            println!("[{}] not configured, skipping\n", provider.name());
            continue;
        }

        for prompt in PROMPTS {
            let start = Instant::now();
            let result = provider.generate(prompt, &settings.generation).await;
            let elapsed = start.elapsed().as_millis();

            match result {
                Ok(text) => println!("[{}] {}ms \"{}\"\n{}\n", provider.name(), elapsed, prompt, text),
                Err(e) => println!("[{}] {}ms \"{}\" failed: {}\n", provider.name(), elapsed, prompt, e),
            }
        }
    }

    Ok(())
}
