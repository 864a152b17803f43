use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    docuflow::cli::run().await
}
