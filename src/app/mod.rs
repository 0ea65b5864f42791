use crate::cli::Cli;
use crate::context::Context;
use crate::error::JackError;
use crate::repository::{self, Repository, ScopedSession};

pub struct App {
    pub ctx: Context,
}

impl App {
    pub fn from_cli(cli: &Cli) -> Result<Self, JackError> {
        let ctx = Context::from_cli(cli)?;
        log_startup_info(&ctx);
        Ok(Self { ctx })
    }

    /// Checks the file, logs in, runs the command and logs out again on
    /// every path out of here.
    pub fn execute(&self, repository: &dyn Repository) -> Result<(), JackError> {
        let ctx = &self.ctx;
        ctx.command.check(&ctx.file)?;

        let session = repository
            .login(&ctx.config.credentials, &ctx.config.workspace)
            .map_err(|source| JackError::Login {
                workspace: ctx.config.workspace.clone(),
                source,
            })?;
        let mut session = ScopedSession::new(session);
        log::info!(
            "🔐 Logged in as {} to workspace {}",
            ctx.config.credentials.username,
            ctx.config.workspace
        );

        let span = ::tracing::info_span!(
            "command",
            name = ctx.command.name(),
            base = %ctx.config.base_path
        );
        let _entered = span.enter();

        let result = ctx.command.run(&mut *session, &ctx.config, &ctx.file);
        session.release();
        result
    }
}

fn log_startup_info(ctx: &Context) {
    log::info!("🚀 Starting jack {}", ctx.command.name());
    log::info!("📄 File: {}", ctx.file.display());
    log::info!("🌳 Base path: {}", ctx.config.base_path);
    if let Some(path) = ctx.log_file.as_deref() {
        log::info!("📝 Log file: {}", path.display());
    }
}

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let app = App::from_cli(cli)?;
    let repository = repository::connect(&app.ctx.config.transport).map_err(JackError::Connect)?;
    app.execute(repository.as_ref())?;
    Ok(())
}
