//! Inference task vocabularies and their request shapes.
//!
//! Each model source labels tasks with its own closed vocabulary: the model
//! catalog uses short codes (e.g. `eqa`, `spc`, `zstc`), while the model hub
//! uses pipeline tags (e.g. `question-answering`). Both vocabularies are
//! mapped exhaustively onto a [`PayloadKind`], which decides how a query is
//! encoded for the endpoint. A task without a payload kind is not supported
//! for structured dispatch.

use std::fmt;
use std::str::FromStr;

use crate::registry::ModelSource;

/// How a query is shaped before it is sent to an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum PayloadKind {
    /// The raw query text.
    PlainText,
    /// A `[question, passage]` pair.
    ExtractiveQuestionAnswering,
    /// A `[sentence, sentence]` pair.
    SentencePair,
    /// The query and a list of candidate labels.
    ZeroShot,
    /// The query and a set of generation hyperparameters.
    TextGeneration,
}

/// Inputs which some payload kinds need beyond the query itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub(crate) enum AuxiliaryField {
    /// A passage in which the answer to the query is found.
    #[strum(to_string = "context")]
    Context,
    /// A second sentence which the query is compared against.
    #[strum(to_string = "comparison sentence")]
    ComparisonSentence,
    /// Comma-separated candidate labels.
    #[strum(to_string = "labels")]
    Labels,
}

impl AuxiliaryField {
    /// The question put to an operator when the input is missing.
    pub(crate) fn question(&self) -> &'static str {
        match self {
            AuxiliaryField::Context => "What context would you like to provide?",
            AuxiliaryField::ComparisonSentence => {
                "What sentence would you like to compare against?"
            }
            AuxiliaryField::Labels => "What labels would you like to use? (comma separated values)",
        }
    }
}

impl PayloadKind {
    pub(crate) fn auxiliary_field(&self) -> Option<AuxiliaryField> {
        match self {
            PayloadKind::PlainText | PayloadKind::TextGeneration => None,
            PayloadKind::ExtractiveQuestionAnswering => Some(AuxiliaryField::Context),
            PayloadKind::SentencePair => Some(AuxiliaryField::ComparisonSentence),
            PayloadKind::ZeroShot => Some(AuxiliaryField::Labels),
        }
    }
}

/// Task codes of the hosted model catalog.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
pub(crate) enum CatalogTask {
    #[strum(to_string = "asr")]
    AutomaticSpeechRecognition,
    #[strum(to_string = "audioembedding")]
    AudioEmbedding,
    #[strum(to_string = "classification")]
    Classification,
    #[strum(to_string = "depth2img")]
    Depth2Img,
    #[strum(to_string = "eqa")]
    ExtractiveQuestionAnswering,
    #[strum(to_string = "fillmask")]
    FillMask,
    #[strum(to_string = "ic")]
    ImageClassification,
    #[strum(to_string = "icembedding")]
    ImageEmbedding,
    #[strum(to_string = "imagegeneration")]
    ImageGeneration,
    #[strum(to_string = "inpainting")]
    Inpainting,
    #[strum(to_string = "is")]
    ImageSegmentation,
    #[strum(to_string = "llm")]
    Llm,
    #[strum(to_string = "ner")]
    NamedEntityRecognition,
    #[strum(to_string = "od")]
    ObjectDetection,
    #[strum(to_string = "od1")]
    ObjectDetection1,
    #[strum(to_string = "regression")]
    Regression,
    #[strum(to_string = "semseg")]
    SemanticSegmentation,
    #[strum(to_string = "sentencesimilarity")]
    SentenceSimilarity,
    #[strum(to_string = "spc")]
    SentencePairClassification,
    #[strum(to_string = "summarization")]
    Summarization,
    #[strum(to_string = "tabtransformerclassification")]
    TabTransformerClassification,
    #[strum(to_string = "tabtransformerregression")]
    TabTransformerRegression,
    #[strum(to_string = "tc")]
    TextClassification,
    #[strum(to_string = "tcembedding")]
    TextClassificationEmbedding,
    #[strum(to_string = "text2text")]
    Text2Text,
    #[strum(to_string = "textembedding")]
    TextEmbedding,
    #[strum(to_string = "textgeneration")]
    TextGeneration,
    #[strum(to_string = "textgeneration1")]
    TextGeneration1,
    #[strum(to_string = "textgeneration2")]
    TextGeneration2,
    #[strum(to_string = "textgenerationjp")]
    TextGenerationJp,
    #[strum(to_string = "textgenerationneuron")]
    TextGenerationNeuron,
    #[strum(to_string = "translation")]
    Translation,
    #[strum(to_string = "txt2img")]
    Txt2Img,
    #[strum(to_string = "upscaling")]
    Upscaling,
    #[strum(to_string = "zstc")]
    ZeroShotTextClassification,
}

impl CatalogTask {
    pub(crate) fn payload_kind(&self) -> Option<PayloadKind> {
        use CatalogTask::*;

        match self {
            TextClassification
            | TextClassificationEmbedding
            | TextEmbedding
            | SentenceSimilarity
            | NamedEntityRecognition
            | FillMask
            | Summarization
            | Translation => Some(PayloadKind::PlainText),
            // The older generation containers take the prompt verbatim.
            TextGeneration1 | TextGeneration2 => Some(PayloadKind::PlainText),
            ExtractiveQuestionAnswering => Some(PayloadKind::ExtractiveQuestionAnswering),
            SentencePairClassification => Some(PayloadKind::SentencePair),
            ZeroShotTextClassification => Some(PayloadKind::ZeroShot),
            TextGeneration => Some(PayloadKind::TextGeneration),
            AutomaticSpeechRecognition
            | AudioEmbedding
            | Classification
            | Depth2Img
            | ImageClassification
            | ImageEmbedding
            | ImageGeneration
            | Inpainting
            | ImageSegmentation
            | Llm
            | ObjectDetection
            | ObjectDetection1
            | Regression
            | SemanticSegmentation
            | TabTransformerClassification
            | TabTransformerRegression
            | Text2Text
            | TextGenerationJp
            | TextGenerationNeuron
            | Txt2Img
            | Upscaling => None,
        }
    }
}

/// Pipeline tags of the model hub.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
pub(crate) enum HubTask {
    #[strum(to_string = "audio-classification")]
    AudioClassification,
    #[strum(to_string = "automatic-speech-recognition")]
    AutomaticSpeechRecognition,
    #[strum(to_string = "conversational")]
    Conversational,
    #[strum(to_string = "depth-estimation")]
    DepthEstimation,
    #[strum(to_string = "document-question-answering")]
    DocumentQuestionAnswering,
    #[strum(to_string = "feature-extraction")]
    FeatureExtraction,
    #[strum(to_string = "fill-mask")]
    FillMask,
    #[strum(to_string = "image-classification")]
    ImageClassification,
    #[strum(to_string = "image-feature-extraction")]
    ImageFeatureExtraction,
    #[strum(to_string = "image-segmentation")]
    ImageSegmentation,
    #[strum(to_string = "image-to-image")]
    ImageToImage,
    #[strum(to_string = "image-to-text")]
    ImageToText,
    #[strum(to_string = "mask-generation")]
    MaskGeneration,
    #[strum(to_string = "object-detection")]
    ObjectDetection,
    #[strum(to_string = "question-answering")]
    QuestionAnswering,
    #[strum(to_string = "sentence-similarity")]
    SentenceSimilarity,
    #[strum(to_string = "summarization")]
    Summarization,
    #[strum(to_string = "table-question-answering")]
    TableQuestionAnswering,
    #[strum(to_string = "text2text-generation")]
    Text2TextGeneration,
    #[strum(to_string = "text-classification")]
    TextClassification,
    #[strum(to_string = "text-generation")]
    TextGeneration,
    #[strum(to_string = "text-to-audio")]
    TextToAudio,
    #[strum(to_string = "token-classification")]
    TokenClassification,
    #[strum(to_string = "translation")]
    Translation,
    #[strum(to_string = "translation_xx_to_yy")]
    TranslationXxToYy,
    #[strum(to_string = "video-classification")]
    VideoClassification,
    #[strum(to_string = "visual-question-answering")]
    VisualQuestionAnswering,
    #[strum(to_string = "zero-shot-classification")]
    ZeroShotClassification,
    #[strum(to_string = "zero-shot-image-classification")]
    ZeroShotImageClassification,
    #[strum(to_string = "zero-shot-audio-classification")]
    ZeroShotAudioClassification,
    #[strum(to_string = "zero-shot-object-detection")]
    ZeroShotObjectDetection,
}

impl HubTask {
    pub(crate) fn payload_kind(&self) -> Option<PayloadKind> {
        use HubTask::*;

        match self {
            TextClassification
            | FeatureExtraction
            | SentenceSimilarity
            | TokenClassification
            | FillMask
            | Summarization
            | Translation
            | TranslationXxToYy => Some(PayloadKind::PlainText),
            QuestionAnswering => Some(PayloadKind::ExtractiveQuestionAnswering),
            ZeroShotClassification => Some(PayloadKind::ZeroShot),
            TextGeneration | Text2TextGeneration => Some(PayloadKind::TextGeneration),
            AudioClassification
            | AutomaticSpeechRecognition
            | Conversational
            | DepthEstimation
            | DocumentQuestionAnswering
            | ImageClassification
            | ImageFeatureExtraction
            | ImageSegmentation
            | ImageToImage
            | ImageToText
            | MaskGeneration
            | ObjectDetection
            | TableQuestionAnswering
            | TextToAudio
            | VideoClassification
            | VisualQuestionAnswering
            | ZeroShotImageClassification
            | ZeroShotAudioClassification
            | ZeroShotObjectDetection => None,
        }
    }
}

/// A task from either vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Task {
    Catalog(CatalogTask),
    Hub(HubTask),
}

impl Task {
    /// Interprets a stored task label in the vocabulary of `source`. Custom
    /// models are usually hub architectures, so the hub vocabulary is tried
    /// before the catalog's.
    pub(crate) fn parse(source: ModelSource, label: &str) -> Option<Task> {
        match source {
            ModelSource::Sagemaker => CatalogTask::from_str(label).ok().map(Task::Catalog),
            ModelSource::HuggingFace => HubTask::from_str(label).ok().map(Task::Hub),
            ModelSource::Custom => HubTask::from_str(label)
                .ok()
                .map(Task::Hub)
                .or_else(|| CatalogTask::from_str(label).ok().map(Task::Catalog)),
        }
    }

    pub(crate) fn payload_kind(&self) -> Option<PayloadKind> {
        match self {
            Task::Catalog(task) => task.payload_kind(),
            Task::Hub(task) => task.payload_kind(),
        }
    }

    /// Whether the label of this task is also a catalog task code, whichever
    /// vocabulary it was parsed from.
    pub(crate) fn in_catalog_vocabulary(&self) -> bool {
        match self {
            Task::Catalog(_) => true,
            Task::Hub(task) => CatalogTask::from_str(&task.to_string()).is_ok(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Catalog(task) => write!(f, "{}", task),
            Task::Hub(task) => write!(f, "{}", task),
        }
    }
}
