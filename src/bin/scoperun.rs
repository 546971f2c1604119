use anyhow::Result;

fn main() -> Result<()> {
    scoperun::cli::run()
}
