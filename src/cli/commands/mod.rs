pub(super) mod config;
pub(super) mod plan;
pub(super) mod publish;
pub(super) mod run;
pub(super) mod status;
