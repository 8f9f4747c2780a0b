use serde_json::Value;

/// Discriminadores conocidos del campo `status` de un evento.
pub mod states {
    pub const QUEUED: &str = "queued";
    pub const PROCESSING: &str = "processing";
    pub const COMPLETE: &str = "complete";
    pub const DONE: &str = "done";
    pub const ERROR: &str = "error";
    pub const RETRYING: &str = "retrying";
    pub const CANCELLED: &str = "cancelled";
    /// Forma corta que emiten algunos productores viejos
    pub const CANCEL: &str = "cancel";
    pub const INITIALIZING: &str = "initializing";
    pub const DOWNLOADING: &str = "downloading";
    pub const PROGRESS: &str = "progress";
    pub const TRACK_PROGRESS: &str = "track_progress";
    pub const TRACK_COMPLETE: &str = "track_complete";
    pub const REAL_TIME: &str = "real_time";
    pub const SKIPPED: &str = "skipped";
    pub const UNKNOWN: &str = "unknown";
}

/// Estados terminales: después de estos no se esperan más avances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Complete,
    Error,
    Cancelled,
}

impl Terminal {
    pub fn default_message(self) -> &'static str {
        match self {
            Terminal::Complete => "Download complete",
            Terminal::Error => "Download error",
            Terminal::Cancelled => "Download cancelled",
        }
    }
}

/// Avance por pista (`progress` / `track_progress`).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackProgress {
    pub track: String,
    pub current: Option<u64>,
    pub total: Option<u64>,
    pub overall_progress: Option<Value>,
    pub album: Option<String>,
}

/// Avance en tiempo real (forma canción/porcentaje).
#[derive(Debug, Clone, PartialEq)]
pub struct RealTimeProgress {
    pub song: Option<String>,
    pub percent: Option<Value>,
    pub percentage: Option<Value>,
    pub time_elapsed: Option<Value>,
}

/// Vista tipada de un evento de estado. Los eventos llegan como JSON sin
/// esquema fijo, así que `decode` nunca falla: lo que no reconoce cae en
/// `Generic`.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Track(TrackProgress),
    RealTime(RealTimeProgress),
    Terminal {
        outcome: Terminal,
        message: Option<String>,
    },
    Initializing {
        album: Option<String>,
    },
    Processing {
        message: Option<String>,
    },
    Generic {
        status: String,
        message: Option<String>,
    },
}

impl StatusEvent {
    pub fn decode(raw: &Value) -> Self {
        let status = status_of(raw);
        let message = text(raw, "message");

        match status {
            states::COMPLETE | states::DONE => StatusEvent::Terminal {
                outcome: Terminal::Complete,
                message,
            },
            states::ERROR => StatusEvent::Terminal {
                outcome: Terminal::Error,
                message,
            },
            states::CANCELLED | states::CANCEL => StatusEvent::Terminal {
                outcome: Terminal::Cancelled,
                message,
            },
            states::PROGRESS | states::TRACK_PROGRESS => match decode_track(raw) {
                Some(track) => StatusEvent::Track(track),
                None => StatusEvent::Generic {
                    status: status.to_string(),
                    message,
                },
            },
            states::REAL_TIME => {
                // algunos productores mandan real_time con la forma de pista
                if raw.get("song").is_none() && raw.get("percent").is_none() {
                    if let Some(track) = decode_track(raw) {
                        return StatusEvent::Track(track);
                    }
                }
                StatusEvent::RealTime(RealTimeProgress {
                    song: text(raw, "song"),
                    percent: field(raw, "percent"),
                    percentage: field(raw, "percentage"),
                    time_elapsed: field(raw, "time_elapsed"),
                })
            }
            states::INITIALIZING => StatusEvent::Initializing {
                album: text(raw, "album"),
            },
            states::PROCESSING => StatusEvent::Processing { message },
            other => StatusEvent::Generic {
                status: other.to_string(),
                message,
            },
        }
    }
}

/// Valor de `status`, o "unknown" si falta o no es texto.
pub fn status_of(raw: &Value) -> &str {
    raw.get("status")
        .and_then(Value::as_str)
        .unwrap_or(states::UNKNOWN)
}

/// Un evento de pista utilizable: progress/track_progress con `track` no vacío.
pub fn is_track_event(raw: &Value) -> bool {
    matches!(status_of(raw), states::PROGRESS | states::TRACK_PROGRESS)
        && text(raw, "track").is_some()
}

/// Interpreta "actual/total". Solo acepta exactamente dos partes enteras y
/// un total distinto de cero.
pub fn parse_fraction(raw: &str) -> Option<(u64, u64)> {
    let mut parts = raw.split('/');
    let current = parts.next()?.trim().parse::<u64>().ok()?;
    let total = parts.next()?.trim().parse::<u64>().ok()?;
    if parts.next().is_some() || total == 0 {
        return None;
    }
    Some((current, total))
}

/// floor(current / total * 100), con tope en 100.
pub fn percent_of(current: u64, total: u64) -> u64 {
    (current.saturating_mul(100) / total).min(100)
}

fn decode_track(raw: &Value) -> Option<TrackProgress> {
    let track = text(raw, "track")?;

    let (current, total) = match (
        count(raw, "parsed_current_track"),
        count(raw, "parsed_total_tracks"),
    ) {
        (Some(c), Some(t)) => (Some(c), Some(t)),
        _ => match raw.get("current_track").and_then(Value::as_str) {
            Some(s) => match parse_fraction(s) {
                Some((c, t)) => (Some(c), Some(t)),
                None => (None, None),
            },
            None => (count(raw, "current_track"), count(raw, "total_tracks")),
        },
    };

    Some(TrackProgress {
        track,
        current,
        total,
        overall_progress: field(raw, "overall_progress"),
        album: text(raw, "album"),
    })
}

/// Texto no vacío.
fn text(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn field(raw: &Value, key: &str) -> Option<Value> {
    raw.get(key).filter(|v| !v.is_null()).cloned()
}

/// Entero no negativo, ya sea número JSON o texto numérico.
fn count(raw: &Value, key: &str) -> Option<u64> {
    match raw.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
