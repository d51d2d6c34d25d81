use anyhow::Result;

fn main() -> Result<()> {
    amoeba::cli::run()
}
