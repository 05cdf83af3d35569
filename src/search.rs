//! CLI reporting for `medassist search` and `medassist ask`.

use anyhow::Result;

use medassist_core::models::RetrievedResult;

use crate::config::Config;
use crate::pipeline::RagPipeline;

/// Print ranked results followed by the context block the LLM would see.
pub async fn run_search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    let (results, context) = pipeline.retrieve_only(query, top_k).await?;

    if results.is_empty() {
        println!("No results.");
    } else {
        print_results(&results);
    }
    println!();
    println!("--- context ---");
    println!("{}", context);
    Ok(())
}

/// Full RAG answer on stdout, sources listed after it.
pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    let answer = pipeline.query(question, None).await?;

    println!("{}", answer.answer);
    println!();
    println!("Sources:");
    print_results(&answer.sources);
    Ok(())
}

fn print_results(results: &[RetrievedResult]) {
    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} (page {})",
            i + 1,
            r.similarity,
            r.source,
            r.page
        );
        println!("    id: {}", r.id);
        let preview: String = r.text.chars().take(120).collect();
        println!("    > {}", preview.replace('\n', " "));
    }
}
