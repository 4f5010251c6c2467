//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and the logger, and register both as providers
//! - Run Init, Setup (on request), Start and Ready callbacks in order
//! - Create the server objects before Start and serve them after it
//! - Hand the caller the exit signal of every background task
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is rolled back
//! - Callbacks run one at a time, never concurrently
//! - Listeners start only after every Start callback has configured them
//!
//! # Data Flow
//! ```text
//! flags → filter check → help-config? → explicit providers
//!     → ServiceConfig (env + file) → logger → user configs → print-config?
//!     → diagnostics endpoint → Init → Setup? → exit-before-start?
//!     → HttpServer + GrpcServer → Start → listeners → Ready → Running
//! ```

use std::any::Any;
use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;

use clap::{ArgMatches, Command, FromArgMatches};

use crate::cli::{self, Flags, Version};
use crate::config::loader::{usage, DynSection, Section};
use crate::config::{ConfigSection, ConfigSource, ServiceConfig};
use crate::error::{BoxError, Error};
use crate::grpc::server::{self as grpc_server, GrpcOptions, GrpcServer};
use crate::http::server::{self as http_server, HttpServer};
use crate::lifecycle::callback::{Callback, Callbacks, Component, Handler};
use crate::lifecycle::exit::{self, ExitSignal, ServeError};
use crate::lifecycle::invoker::run_phase;
use crate::lifecycle::phase::{Phase, Progress, State};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::shutdown_signal;
use crate::module::ModuleFilter;
use crate::net::listener::ListenerError;
use crate::observability::logging::{self, Logger};
use crate::observability::metrics;
use crate::provider::{Provider, Providers};

const FALLBACK_NAME: &str = "service";

type CommandHook = Box<dyn Fn(Command) -> Command + Send + Sync>;
type CliAction = Box<dyn FnOnce(&ArgMatches) -> Result<(), BoxError> + Send>;

/// The executable's file name, used when no service name is set.
pub fn default_name() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Accumulates everything a service is made of.
///
/// Callbacks of the same phase run in the order they were added.
pub struct ServiceBuilder {
    name: Option<String>,
    sections: Vec<Box<dyn DynSection>>,
    callbacks: Callbacks,
    default_disabled: Vec<String>,
    providers: Vec<Provider>,
    http: bool,
    grpc: bool,
    flags: Option<Flags>,
    logger: Option<Logger>,
    version: Option<Version>,
    command_hooks: Vec<CommandHook>,
    subcommands: Vec<(Command, CliAction)>,
    preactions: Vec<CliAction>,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            sections: Vec::new(),
            callbacks: Callbacks::default(),
            default_disabled: Vec::new(),
            providers: Vec::new(),
            http: false,
            grpc: false,
            flags: None,
            logger: None,
            version: None,
            command_hooks: Vec::new(),
            subcommands: Vec::new(),
            preactions: Vec::new(),
        }
    }

    /// Service name. Defaults to the executable name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Load `T` from the configuration and register it as a provider.
    pub fn config<T: ConfigSection>(mut self) -> Self {
        self.sections.push(Section::<T>::boxed());
        self
    }

    /// Use these flags instead of parsing the process arguments.
    pub fn flags(mut self, flags: Flags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Use this logger instead of building one from the configuration.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Ignored when every field is empty.
    pub fn version(mut self, version: Version) -> Self {
        self.version = version.any().then_some(version);
        self
    }

    pub fn init<H, Args>(self, name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.on(Phase::Init, Callback::new(name, handler))
    }

    /// Runs only with `--setup`.
    pub fn setup<H, Args>(self, name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.on(Phase::Setup, Callback::new(name, handler))
    }

    /// `HttpServer` and `GrpcServer` are available from here on.
    pub fn start<H, Args>(self, name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.on(Phase::Start, Callback::new(name, handler))
    }

    /// `HttpAddr` and `GrpcAddr` are available from here on.
    pub fn ready<H, Args>(self, name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.on(Phase::Ready, Callback::new(name, handler))
    }

    pub fn component(mut self, component: Component) -> Self {
        if component.is_disabled() {
            self.default_disabled.push(component.name().to_string());
        }
        for (phase, callback) in component.into_callbacks() {
            self.callbacks.push(phase, callback);
        }
        self
    }

    /// Disable modules unless enabled from the command line.
    pub fn default_disable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_disabled.extend(names.into_iter().map(Into::into));
        self
    }

    /// Register a provider before anything else.
    pub fn provide<T: Any + Send + Sync>(self, value: T) -> Self {
        self.provide_provider(Provider::new(value))
    }

    pub fn provide_provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn http(mut self, enabled: bool) -> Self {
        self.http = enabled;
        self
    }

    pub fn grpc(mut self, enabled: bool) -> Self {
        self.grpc = enabled;
        self
    }

    /// Adjust the command line, e.g. to add flags a preaction reads.
    pub fn cli<F>(mut self, hook: F) -> Self
    where
        F: Fn(Command) -> Command + Send + Sync + 'static,
    {
        self.command_hooks.push(Box::new(hook));
        self
    }

    /// Add a subcommand. When it is invoked, `action` runs instead of the
    /// service.
    pub fn subcommand<F>(mut self, command: Command, action: F) -> Self
    where
        F: FnOnce(&ArgMatches) -> Result<(), BoxError> + Send + 'static,
    {
        self.subcommands.push((command, Box::new(action)));
        self
    }

    /// Runs on the parsed arguments before the service starts. A failure
    /// aborts the run.
    pub fn preaction<F>(mut self, action: F) -> Self
    where
        F: FnOnce(&ArgMatches) -> Result<(), BoxError> + Send + 'static,
    {
        self.preactions.push(Box::new(action));
        self
    }

    /// The command line of this service, e.g. to embed it as a subcommand.
    pub fn command(&self) -> Command {
        let name = self.name.clone().unwrap_or_else(default_name);
        let command = self
            .subcommands
            .iter()
            .fold(cli::command(&name, self.version.as_ref()), |command, (sub, _)| {
                command.subcommand(sub.clone())
            });

        self.command_hooks.iter().fold(command, |command, hook| hook(command))
    }

    pub fn build(self) -> Service {
        let command = self.command();

        Service {
            name: self.name.unwrap_or_else(default_name),
            sections: self.sections,
            callbacks: self.callbacks,
            default_disabled: self.default_disabled,
            providers: self.providers,
            http: self.http,
            grpc: self.grpc,
            flags: self.flags,
            logger: self.logger,
            version: self.version,
            command,
        }
    }

    /// Act on parsed arguments.
    ///
    /// Runs the matched subcommand and returns `None`, or runs the preactions
    /// in order and returns the service configured by the parsed [`Flags`].
    pub fn dispatch(mut self, matches: &ArgMatches) -> Result<Option<Service>, Error> {
        if let Some((name, sub_matches)) = matches.subcommand() {
            if let Some(index) = self.subcommands.iter().position(|(sub, _)| sub.get_name() == name) {
                let (_, action) = self.subcommands.swap_remove(index);
                action(sub_matches).map_err(Error::Cli)?;
                return Ok(None);
            }
        }

        for preaction in std::mem::take(&mut self.preactions) {
            preaction(matches).map_err(Error::Cli)?;
        }

        let flags = Flags::from_arg_matches(matches).map_err(|e| Error::Cli(e.into()))?;
        Ok(Some(self.flags(flags).build()))
    }

    /// Parse the process arguments, run the service (or the invoked
    /// subcommand) until it exits, and map the outcome to a process exit code.
    pub async fn run_cli(self) -> ExitCode {
        let matches = self.command().get_matches();

        let result = match self.dispatch(&matches) {
            Ok(Some(service)) => service.run().await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        }
    }

    fn on(mut self, phase: Phase, callback: Callback) -> Self {
        self.callbacks.push(phase, callback);
        self
    }
}

/// A fully described service, ready to start.
pub struct Service {
    name: String,
    sections: Vec<Box<dyn DynSection>>,
    callbacks: Callbacks,
    default_disabled: Vec<String>,
    providers: Vec<Provider>,
    http: bool,
    grpc: bool,
    flags: Option<Flags>,
    logger: Option<Logger>,
    version: Option<Version>,
    command: Command,
}

impl Service {
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flags set on the builder or by [`ServiceBuilder::dispatch`].
    pub fn flags(&self) -> Option<&Flags> {
        self.flags.as_ref()
    }

    /// Bootstrap the service.
    ///
    /// Returns once Ready callbacks are done. Failures of background tasks
    /// arrive later, on [`Running::exit_signal`].
    pub async fn start(self) -> Result<Running, Error> {
        let mut progress = Progress::new();

        let flags = match self.flags {
            Some(flags) => flags,
            None => cli::parse(self.command),
        };

        let filter = ModuleFilter::new(&flags.selection, &self.default_disabled)?;
        let (reporter, signal) = exit::channel();
        let shutdown = Shutdown::new();
        let providers = Providers::new();

        if flags.help_config {
            print!("{}", usage(&self.name, &self.sections)?);
            reporter.report(Ok(()));
            progress.advance(State::Exited);
            return Ok(Running::new(providers, signal, shutdown, progress.state(), 0));
        }

        providers.extend(self.providers);

        let source = ConfigSource::load(&self.name, flags.config_path.as_deref())?;
        let config = source.service_config()?;
        providers.add(config.clone());

        let logger = match self.logger {
            Some(logger) => logger,
            None => logging::init(&self.name, &config.log)?,
        };
        providers.add(logger.clone());
        progress.advance(State::LoggingReady);
        logger.debug("log init");

        if let Some(version) = &self.version {
            tracing::info!(logger = %logger, version = %version, "initializing");
        }

        let configs_logger = logger.named("configs");
        let mut user_configs = serde_json::Map::new();
        for section in &self.sections {
            let loaded = section.load(&source, &configs_logger)?;
            providers.add_provider(loaded.provider);
            if let Some(rendered) = loaded.rendered {
                user_configs.insert(section.name().to_string(), rendered);
            }
        }

        if flags.print_config {
            print_config(&logger, &config, user_configs);
        }

        if config.diagnostics.enabled {
            let address: SocketAddr = config.diagnostics.address.parse().map_err(|e| Error::Listener {
                facility: "diagnostics",
                source: ListenerError::Address(e),
            })?;
            metrics::spawn_exporter(address, reporter.clone())?;
        }

        let grpc_options = GrpcOptions::default();
        providers.add(shutdown.clone());
        providers.add(reporter.clone());
        providers.add(grpc_options.clone());

        let callbacks = &self.callbacks;
        let run = |phase: Phase| run_phase(phase, &filter, callbacks.phase(phase), &providers, &logger);

        progress.advance(State::Initializing);
        run(Phase::Init).await?;

        if flags.setup {
            progress.advance(State::SettingUp);
            run(Phase::Setup).await?;
        }

        progress.advance(State::EarlyExitCheck);
        if flags.exit_before_start {
            logger.info("exit before start");
            reporter.report(Ok(()));
            progress.advance(State::Exited);
            return Ok(Running::new(providers, signal, shutdown, progress.state(), 0));
        }

        let http = HttpServer::new();
        let grpc = GrpcServer::new();
        providers.add(http.clone());
        providers.add(grpc.clone());
        progress.advance(State::ServerObjectsCreated);

        progress.advance(State::Starting);
        run(Phase::Start).await?;

        progress.advance(State::ListenersLive);
        let mut listeners = 0;

        if self.grpc && config.grpc.enabled {
            let addr = grpc_server::start(&grpc, &grpc_options, &config.grpc, &shutdown, reporter.clone())
                .await
                .map_err(|source| Error::Listener {
                    facility: "grpc",
                    source,
                })?;
            logger.named("grpc").debug(format_args!("grpc started on {}", addr.0));
            providers.add(addr);
            listeners += 1;
        } else {
            logger.debug("not starting GRPC server");
        }

        if self.http && config.http.enabled {
            let addr = http_server::start(&http, &config.http, &shutdown, reporter.clone())
                .await
                .map_err(|source| Error::Listener {
                    facility: "http",
                    source,
                })?;
            logger.named("http").debug(format_args!("http started on {}", addr.0));
            providers.add(addr);
            listeners += 1;
        } else {
            logger.debug("not starting HTTP server");
        }

        progress.advance(State::ReadyPhase);
        run(Phase::Ready).await?;

        progress.advance(State::Serving);
        logger.info("ready!");

        Ok(Running::new(providers, signal, shutdown, progress.state(), listeners))
    }

    /// Start, then wait for the first background task to exit or for a
    /// termination signal, which shuts the listeners down gracefully.
    pub async fn run(self) -> Result<(), Error> {
        let mut running = self.start().await?;

        tokio::select! {
            outcome = running.signal.recv() => outcome?,
            () = shutdown_signal() => {
                running.shutdown();
                if running.listeners > 0 {
                    running.signal.recv().await?;
                }
            }
        }

        Ok(())
    }
}

fn print_config(logger: &Logger, config: &ServiceConfig, user_configs: serde_json::Map<String, serde_json::Value>) {
    let user_cfgs = serde_json::Value::Object(user_configs).to_string();

    match serde_json::to_string(config) {
        Ok(svc_cfg) => {
            tracing::info!(logger = %logger, svc_cfg = %svc_cfg, user_cfgs = %user_cfgs, "configs");
        }
        Err(e) => {
            tracing::warn!(logger = %logger, error = %e, user_cfgs = %user_cfgs, "cannot render service config");
        }
    }
}

/// A bootstrapped service.
///
/// Holds the registry, so providers stay alive as long as this does.
#[derive(Debug)]
pub struct Running {
    providers: Providers,
    signal: ExitSignal,
    shutdown: Shutdown,
    state: State,
    listeners: usize,
}

impl Running {
    fn new(
        providers: Providers,
        signal: ExitSignal,
        shutdown: Shutdown,
        state: State,
        listeners: usize,
    ) -> Self {
        Self {
            providers,
            signal,
            shutdown,
            state,
            listeners,
        }
    }

    /// `Serving`, or `Exited` when the bootstrap stopped early on request.
    pub fn state(&self) -> State {
        self.state
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Background task outcomes. Read the first to learn why serving stopped.
    pub fn exit_signal(&mut self) -> &mut ExitSignal {
        &mut self.signal
    }

    /// Ask the listeners to stop accepting and finish in-flight requests.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Number of listeners serving in the background.
    pub fn listeners(&self) -> usize {
        self.listeners
    }

    /// Wait for the first background task outcome.
    pub async fn wait(mut self) -> Result<(), ServeError> {
        self.signal.recv().await
    }
}
