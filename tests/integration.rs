#[path = "integration/fixtures/mod.rs"]
mod fixtures;

#[path = "integration/pipeline.rs"]
mod pipeline;
#[path = "integration/cli.rs"]
mod cli;
