use jayster_core::{ClockPort, PortError};

#[derive(Debug, Clone, Default)]
pub struct SystemClockAdapter;

impl ClockPort for SystemClockAdapter {
    fn now_ms(&self) -> Result<u64, PortError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| PortError::Transport(format!("system clock before unix epoch: {e}")))?;
        Ok(now.as_millis() as u64)
    }
}
