use serde::{Deserialize, Serialize};

/// Modelos de embedding soportados
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingModel {
    /// nomic-embed-text (768 dimensiones)
    NomicEmbedText,
    /// mxbai-embed-large (1024 dimensiones)
    MxbaiEmbedLarge,
    /// all-minilm (384 dimensiones)
    AllMiniLm,
    /// Modelo personalizado
    Custom(String),
}

impl EmbeddingModel {
    /// Resuelve un modelo a partir de su nombre en el servidor de embeddings
    pub fn from_name(name: &str) -> Self {
        match name {
            "nomic-embed-text" => EmbeddingModel::NomicEmbedText,
            "mxbai-embed-large" => EmbeddingModel::MxbaiEmbedLarge,
            "all-minilm" => EmbeddingModel::AllMiniLm,
            other => EmbeddingModel::Custom(other.to_string()),
        }
    }

    /// Retorna la dimensión esperada del vector
    pub fn dimension(&self) -> usize {
        match self {
            EmbeddingModel::NomicEmbedText => 768,
            EmbeddingModel::MxbaiEmbedLarge => 1024,
            EmbeddingModel::AllMiniLm => 384,
            EmbeddingModel::Custom(_) => 0, // Debe especificarse manualmente
        }
    }

    /// Nombre del modelo tal como lo espera el servidor
    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingModel::NomicEmbedText => "nomic-embed-text",
            EmbeddingModel::MxbaiEmbedLarge => "mxbai-embed-large",
            EmbeddingModel::AllMiniLm => "all-minilm",
            EmbeddingModel::Custom(name) => name,
        }
    }
}

/// Vector de embedding con metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    /// Valores del vector
    pub vector: Vec<f32>,

    /// Modelo usado para generar el embedding
    pub model: EmbeddingModel,

    /// Dimensión del vector
    pub dimension: usize,
}

impl EmbeddingVector {
    /// Crea un nuevo vector de embedding
    pub fn new(vector: Vec<f32>, model: EmbeddingModel) -> Self {
        let dimension = vector.len();
        Self {
            vector,
            model,
            dimension,
        }
    }

    /// Un vector válido tiene la dimensión esperada y solo valores finitos
    pub fn is_well_formed(&self, expected_dimension: usize) -> bool {
        self.dimension == expected_dimension
            && self.vector.len() == expected_dimension
            && self.vector.iter().all(|v| v.is_finite())
    }

    /// Verifica si el vector está normalizado
    pub fn is_normalized(&self) -> bool {
        let norm: f32 = self.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        (norm - 1.0).abs() < 1e-5
    }
}
