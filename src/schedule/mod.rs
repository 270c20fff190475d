//! Daily Wi-Fi scheduler
//! Turns Wi-Fi on and off at fixed local times until cancelled

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, NaiveTime, Timelike};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ScheduleConfig;
use crate::error::{on_off, Result};
use crate::router::RouterSession;

/// Something that can switch the Wi-Fi radios as a whole
#[async_trait]
pub trait WifiSwitch: Send + Sync {
    async fn set_wifi(&self, enable: bool) -> Result<()>;
}

/// Router session that logs in again when the router has dropped it.
///
/// Scheduled switches are hours apart, so the router has usually expired
/// the session by the next one.
pub struct SessionSwitch {
    session: RouterSession,
    password: String,
}

impl SessionSwitch {
    pub fn new(session: RouterSession, password: String) -> Self {
        Self { session, password }
    }
}

#[async_trait]
impl WifiSwitch for SessionSwitch {
    async fn set_wifi(&self, enable: bool) -> Result<()> {
        if !self.session.is_authenticated().await {
            self.session.authenticate(&self.password).await?;
        }

        match self.session.toggle_wifi(enable).await {
            Err(e) if e.is_authentication() => {
                tracing::info!("[Schedule] Session not valid ({}), logging in", e);
                self.session.authenticate(&self.password).await?;
                self.session.toggle_wifi(enable).await
            }
            other => other,
        }
    }
}

/// Whether Wi-Fi should be on at `time`, handling windows that span midnight
pub fn desired_state(on_time: NaiveTime, off_time: NaiveTime, time: NaiveTime) -> bool {
    if on_time < off_time {
        on_time <= time && time < off_time
    } else {
        time >= on_time || time < off_time
    }
}

pub struct WifiScheduler<S: WifiSwitch> {
    switch: S,
    on_time: NaiveTime,
    off_time: NaiveTime,
    check_interval: Duration,
    apply_on_start: bool,
    /// Time of the previous check; switches between it and the next check fire
    last_check: Option<NaiveDateTime>,
}

impl<S: WifiSwitch> WifiScheduler<S> {
    pub fn new(switch: S, config: &ScheduleConfig) -> anyhow::Result<Self> {
        let (on_time, off_time) = config.times()?;
        Ok(Self {
            switch,
            on_time,
            off_time,
            check_interval: Duration::from_secs(config.check_interval_secs.max(1)),
            apply_on_start: config.apply_on_start,
            last_check: None,
        })
    }

    /// Latest scheduled switch in `(since, now]`: the time it was due and
    /// whether it turns Wi-Fi on.
    ///
    /// Without a previous check the window opens at the start of the
    /// current minute.
    fn due(&self, since: Option<NaiveDateTime>, now: NaiveDateTime) -> Option<(NaiveDateTime, bool)> {
        let since = match since {
            Some(since) => since,
            None => now.with_second(0)?.with_nanosecond(0)? - chrono::Duration::seconds(1),
        };

        [(self.on_time, true), (self.off_time, false)]
            .into_iter()
            .filter_map(|(time, enable)| {
                let today = now.date().and_time(time);
                let latest = if today <= now {
                    today
                } else {
                    today - chrono::Duration::days(1)
                };
                (latest > since).then_some((latest, enable))
            })
            .max_by_key(|(at, _)| *at)
    }

    /// Run whatever fell due since the previous check, returning the action taken
    pub async fn tick(&mut self, now: NaiveDateTime) -> Option<bool> {
        let since = self.last_check.replace(now);
        let (at, enable) = self.due(since, now)?;

        tracing::info!(
            "[Schedule] {} reached, turning WiFi {}",
            at.format("%H:%M"),
            on_off(enable)
        );
        self.apply(enable).await;
        Some(enable)
    }

    /// Put Wi-Fi into the state the schedule expects at `now`
    pub async fn catch_up(&mut self, now: NaiveDateTime) -> bool {
        self.last_check = Some(now);
        let enable = desired_state(self.on_time, self.off_time, now.time());
        tracing::info!("[Schedule] Applying scheduled state: WiFi {}", on_off(enable));
        self.apply(enable).await;
        enable
    }

    async fn apply(&self, enable: bool) {
        match self.switch.set_wifi(enable).await {
            Ok(()) => tracing::info!("[Schedule] WiFi turned {}", on_off(enable)),
            Err(e) => tracing::error!("[Schedule] Failed to turn WiFi {}: {}", on_off(enable), e),
        }
    }

    /// Main loop, returns once `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            "[Schedule] Starting: on at {}, off at {}, checking every {}s",
            self.on_time.format("%H:%M"),
            self.off_time.format("%H:%M"),
            self.check_interval.as_secs()
        );

        if self.apply_on_start {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("[Schedule] Stopped");
                    return;
                }
                _ = self.catch_up(Local::now().naive_local()) => {}
            }
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.check_interval) => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.tick(Local::now().naive_local()) => {}
            }
        }

        tracing::info!("[Schedule] Stopped");
    }
}
