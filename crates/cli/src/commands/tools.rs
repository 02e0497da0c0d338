//! `evos tools`: Print the tool catalogue as the model sees it.

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", evos_tools::format_for_prompt(&evos_tools::definitions()));
    Ok(())
}
