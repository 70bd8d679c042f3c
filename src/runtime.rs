// Event loop: serial, HTTP and sensor polling plus the safety watchdog
// Note: the watchdog stops the car if either the RF control signal or the
// operator presence line stays inactive for longer than the stale threshold.
//
// Each iteration polls, in order: one serial byte, one HTTP connection, both
// sensor lines, then yields. After the yield the supervisor tick runs if its
// interval is due, so its period is wall-clock based and not tied to iteration count.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError};
use crate::controller::Controller;
use crate::hardware::{Actuator, SensorLines, SimulatedBoard, SimulatedSensors};
use crate::supervisor::{Alerts, SafetySupervisor};
use crate::transport::{
    ByteSource, HttpConnection, HttpEndpoint, SerialLink, TransportError, decode_token,
};

/// Errors that stop the runtime from starting
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct Runtime<A: Actuator, S: SensorLines> {
    controller: Controller<A>,
    supervisor: SafetySupervisor,
    sensors: S,
    serial: Option<Box<dyn ByteSource + Send>>,
    http: Option<HttpEndpoint>,
    loop_yield: Duration,
    supervisor_period: Duration,
}

impl<A: Actuator, S: SensorLines> Runtime<A, S> {
    pub fn new(controller: Controller<A>, sensors: S, config: &Config) -> Self {
        Self {
            controller,
            supervisor: SafetySupervisor::new(Instant::now(), config.stale_threshold),
            sensors,
            serial: None,
            http: None,
            loop_yield: config.loop_yield,
            supervisor_period: config.supervisor_period,
        }
    }

    pub fn with_serial(mut self, serial: Box<dyn ByteSource + Send>) -> Self {
        self.serial = Some(serial);
        self
    }

    pub fn with_http(mut self, http: HttpEndpoint) -> Self {
        self.http = Some(http);
        self
    }

    pub fn controller(&self) -> &Controller<A> {
        &self.controller
    }

    pub fn supervisor(&self) -> &SafetySupervisor {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut SafetySupervisor {
        &mut self.supervisor
    }

    /// One pass over all input sources (no yield)
    pub async fn run_iteration(&mut self) {
        // 1. Serial
        self.poll_serial().await;

        // 2. HTTP
        self.poll_http().await;

        // 3. Instantaneous sensor sample (second freshness path next to the supervisor)
        self.supervisor.sample(&mut self.sensors, Instant::now());
    }

    /// Read at most one buffered serial byte and dispatch it
    pub async fn poll_serial(&mut self) {
        let Some(serial) = self.serial.as_mut() else {
            return;
        };

        let byte = match serial.poll_byte() {
            Ok(Some(byte)) => byte,
            Ok(None) => return,
            Err(e) => {
                warn!("Serial error: {}", e);
                return;
            }
        };

        match decode_token(byte) {
            Ok(token) if !token.is_empty() => {
                self.controller.handle(&token).await;
            }
            Ok(_) => {}
            Err(e) => warn!("Serial error: {}", e),
        }
    }

    /// Serve at most one pending HTTP connection
    pub async fn poll_http(&mut self) {
        let accepted = match &self.http {
            Some(http) => http.try_accept().await,
            None => return,
        };

        match accepted {
            Ok(Some(conn)) => self.serve(conn).await,
            Ok(None) => {}
            Err(e) => warn!("HTTP accept error: {}", e),
        }
    }

    async fn serve(&mut self, mut conn: HttpConnection) {
        let peer = conn.peer();
        match conn.read_token().await {
            Ok(Some(token)) => {
                debug!("HTTP command {:?} from {}", token, peer);
                self.controller.handle(&token).await;
            }
            Ok(None) => debug!("HTTP request from {} without command", peer),
            Err(e) => {
                // Dropping the connection closes it
                warn!("HTTP read error from {}: {}", peer, e);
                return;
            }
        }

        if let Err(e) = conn.respond().await {
            warn!("HTTP write error to {}: {}", peer, e);
        }
    }

    /// Supervisor tick: sample, check, and stop + alert for each stale line
    pub async fn supervise(&mut self) -> Alerts {
        let alerts = self.supervisor.tick(&mut self.sensors, Instant::now());
        for _line in alerts.lines() {
            self.controller.force_stop();
            self.controller.pulse_horn().await;
        }
        alerts
    }

    /// Run the loop until `shutdown` completes, then run the shutdown sequence
    pub async fn run_until<F: Future>(mut self, shutdown: F) -> A {
        let mut supervisor_tick = interval_at(
            Instant::now() + self.supervisor_period,
            self.supervisor_period,
        );
        supervisor_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Runtime started: {}ms supervisor tick, {}ms loop yield",
            self.supervisor_period.as_millis(),
            self.loop_yield.as_millis()
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = self.run_iteration() => {}
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = sleep(self.loop_yield) => {}
            }

            // Supervisor runs only once its period has elapsed; never waits for it
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = supervisor_tick.tick() => {
                    self.supervise().await;
                }
                _ = std::future::ready(()) => {}
            }
        }

        self.shutdown()
    }

    /// Stop, zero duty, release outputs and close transports
    fn shutdown(self) -> A {
        info!("Shutting down: stopping motors and releasing outputs");
        let Runtime {
            controller,
            serial,
            http,
            ..
        } = self;
        drop(http);
        drop(serial);
        controller.shutdown()
    }
}

/// Build the runtime from config and run it until Ctrl+C
pub async fn run(config: Config) -> Result<(), RuntimeError> {
    config.validate()?;

    // No GPIO layer on this target: drive the in-memory board
    info!("Using simulated board ({} Hz PWM)", config.pwm_frequency_hz);
    let sensors = if config.simulate_signals {
        info!("Simulated sensor lines held active");
        SimulatedSensors::held_active()
    } else {
        SimulatedSensors::new()
    };
    let controller = Controller::new(SimulatedBoard::new(), &config);
    let mut runtime = Runtime::new(controller, sensors, &config);

    if let Some(port) = &config.serial_port {
        let link = SerialLink::open(port, config.serial_baudrate, config.serial_timeout)?;
        runtime = runtime.with_serial(Box::new(link));
    }

    if let Some(addr) = config.http_bind {
        let endpoint =
            HttpEndpoint::bind(addr, config.accept_timeout, config.request_read_limit).await?;
        runtime = runtime.with_http(endpoint);
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Interrupt received");
    };

    runtime.run_until(shutdown).await;
    Ok(())
}
