fn main() -> anyhow::Result<()> {
    llmexec::observability::init_tracing();
    let code = llmexec::run_cli()?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
