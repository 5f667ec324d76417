use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Estado de un evento de ingesta en la cola
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Esperando a ser reclamado por un worker
    Pending,
    /// Reclamado por exactamente un worker
    Processing,
    /// Terminal: pipeline completado
    Completed,
    /// Terminal: pipeline fallido (ver `error_message`)
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Processing => "processing",
            EventStatus::Completed => "completed",
            EventStatus::Failed => "failed",
        }
    }

    /// Estados sin transición de salida
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Failed)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "processing" => Ok(EventStatus::Processing),
            "completed" => Ok(EventStatus::Completed),
            "failed" => Ok(EventStatus::Failed),
            other => Err(anyhow!("Unknown event status: {}", other)),
        }
    }
}

/// Origen del evento
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Descubierto por el feed watcher
    Feed,
    /// Solicitado bajo demanda por el resto del producto
    Manual,
    /// Carga histórica
    Backfill,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Feed => "feed",
            EventSource::Manual => "manual",
            EventSource::Backfill => "backfill",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feed" => Ok(EventSource::Feed),
            "manual" => Ok(EventSource::Manual),
            "backfill" => Ok(EventSource::Backfill),
            other => Err(anyhow!("Unknown event source: {}", other)),
        }
    }
}

/// Clave de deduplicación: identifica un evento lógico
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupeKey {
    pub ticker: String,
    pub form_type: String,
    pub filed_at: DateTime<Utc>,
}

impl DedupeKey {
    pub fn new(ticker: impl Into<String>, form_type: impl Into<String>, filed_at: DateTime<Utc>) -> Self {
        Self {
            ticker: ticker.into(),
            form_type: form_type.into(),
            filed_at,
        }
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.ticker, self.form_type, self.filed_at.to_rfc3339())
    }
}

/// Datos para crear un evento (entrada de `enqueue`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub ticker: String,
    pub external_id: String,
    pub document_url: String,
    pub form_type: String,
    pub filed_at: DateTime<Utc>,
    pub source: EventSource,
    pub is_priority: bool,
}

impl NewEvent {
    /// Crea un evento de feed, sin prioridad
    pub fn new(
        ticker: impl Into<String>,
        external_id: impl Into<String>,
        document_url: impl Into<String>,
        form_type: impl Into<String>,
        filed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            external_id: external_id.into(),
            document_url: document_url.into(),
            form_type: form_type.into(),
            filed_at,
            source: EventSource::Feed,
            is_priority: false,
        }
    }

    pub fn with_source(mut self, source: EventSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_priority(mut self, is_priority: bool) -> Self {
        self.is_priority = is_priority;
        self
    }

    pub fn dedupe_key(&self) -> DedupeKey {
        DedupeKey::new(self.ticker.clone(), self.form_type.clone(), self.filed_at)
    }
}

/// Evento de ingesta: unidad de trabajo de la cola
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionEvent {
    /// Identificador opaco generado al crear
    pub id: Uuid,

    /// Ticker interno
    pub ticker: String,

    /// Identificador externo del emisor (p. ej. CIK)
    pub external_id: String,

    /// URL del documento o de su página índice
    pub document_url: String,

    /// Tipo de formulario (10-K, 8-K, ...)
    pub form_type: String,

    /// Fecha de presentación del filing (no de su descubrimiento)
    pub filed_at: DateTime<Utc>,

    pub status: EventStatus,
    pub source: EventSource,
    pub is_priority: bool,

    /// Veces que el evento ha sido reclamado
    pub attempts: i32,

    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IngestionEvent {
    /// Crea un evento PENDING a partir de los datos de entrada
    pub fn from_new(new: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: new.ticker,
            external_id: new.external_id,
            document_url: new.document_url,
            form_type: new.form_type,
            filed_at: new.filed_at,
            status: EventStatus::Pending,
            source: new.source,
            is_priority: new.is_priority,
            attempts: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> DedupeKey {
        DedupeKey::new(self.ticker.clone(), self.form_type.clone(), self.filed_at)
    }
}
