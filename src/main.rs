//! SM CNN walkthrough: scores candidate answers for a question and prints every layer's shape.
//!
//! Usage: `smcnn [question] [answer...]`

use anyhow::{Context, bail};
use mimalloc::MiMalloc;

use smcnn::config::Config;
use smcnn::constants::OVERLAP_FEATURE_COUNT;
use smcnn::embedding::{SentenceEncoder, WordVectors, select_device};
use smcnn::features::{IdfTable, OverlapFeatures};
use smcnn::model::{AuxFeatures, ExecutionMode, ModelConfig, ModelParameters};
use smcnn::scoring::PairScorer;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const DEFAULT_QUESTION: &str = "Who is the author of the book The Iron Lady ?";
const DEFAULT_ANSWERS: &[&str] = &[
    "The Iron Lady : A Biography of Margaret Thatcher by Hugo Young .",
    "Margaret Thatcher was prime minister of Britain from 1979 to 1990 .",
    "The book was published in 1989 .",
];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let (question, answers) = parse_args(std::env::args().skip(1).collect());

    tracing::info!(
        model_path = ?config.model_path,
        word_vectors_path = ?config.word_vectors_path,
        device = ?config.device,
        candidates = answers.len(),
        "SM CNN walkthrough starting"
    );

    let device = select_device(config.device)?;

    let vectors = match &config.word_vectors_path {
        Some(path) => Some(WordVectors::from_file(path)?),
        None => None,
    };

    let scorer = match &config.model_path {
        Some(path) => PairScorer::load(path.clone(), &device)?,
        None => {
            tracing::warn!(
                seed = config.demo_seed,
                "No SMCNN_MODEL_PATH configured, scoring with seeded demo parameters"
            );
            let mut model_config = ModelConfig::reference();
            if let Some(vectors) = &vectors {
                model_config = model_config.with_embedding_dim(vectors.dim());
            }
            let params = ModelParameters::seeded(model_config, config.demo_seed, &device)?;
            PairScorer::from_parameters(params)?
        }
    };
    let model_config = scorer
        .config()
        .cloned()
        .context("scorer has no model bound")?;

    let vectors = match vectors {
        Some(vectors) if vectors.dim() != model_config.embedding_dim => bail!(
            "word vectors have {} dimensions but the model expects {}",
            vectors.dim(),
            model_config.embedding_dim
        ),
        Some(vectors) => vectors,
        None => {
            tracing::warn!("No SMCNN_WORD_VECTORS_PATH configured, using hashed unknown-word vectors");
            WordVectors::empty(model_config.embedding_dim)
        }
    };

    let encoder = SentenceEncoder::new(vectors, config.encoder_config(), device.clone())?;

    let question_tokens = encoder.tokens(&question)?;
    let answer_tokens = answers
        .iter()
        .map(|answer| encoder.tokens(answer))
        .collect::<Result<Vec<_>, _>>()?;

    let idf = IdfTable::from_documents(
        std::iter::once(&question_tokens).chain(answer_tokens.iter()),
    );

    let question_matrix = encoder.encode_tokens(&question_tokens)?;
    let answer_matrices = answer_tokens
        .iter()
        .map(|tokens| encoder.encode_tokens(tokens))
        .collect::<Result<Vec<_>, _>>()?;

    let aux_rows = if model_config.use_aux_features {
        if model_config.aux_feature_count != OVERLAP_FEATURE_COUNT {
            bail!(
                "model expects {} auxiliary features, the walkthrough computes {}",
                model_config.aux_feature_count,
                OVERLAP_FEATURE_COUNT
            );
        }
        let rows = answer_tokens
            .iter()
            .map(|tokens| {
                let features = OverlapFeatures::compute(&question_tokens, tokens, &idf);
                tracing::debug!(?features, "Overlap features");
                features.to_aux(&device)
            })
            .collect::<Result<Vec<AuxFeatures>, _>>()?;
        Some(rows)
    } else {
        None
    };

    println!("question: {question}");
    println!("  tokens: {question_tokens:?}");

    for (idx, answer_matrix) in answer_matrices.iter().enumerate() {
        let aux = aux_rows.as_ref().map(|rows| &rows[idx]);
        let traced = scorer.score_traced(
            &question_matrix,
            answer_matrix,
            aux,
            ExecutionMode::Inference,
        )?;
        let trace = &traced.trace;

        println!("candidate {idx}: {}", answers[idx]);
        println!(
            "  question  {:?} -> conv {:?} -> pool {:?} -> {:?}",
            trace.question.input,
            trace.question.convolved,
            trace.question.pooled,
            trace.question.flattened
        );
        println!(
            "  answer    {:?} -> conv {:?} -> pool {:?} -> {:?}",
            trace.answer.input, trace.answer.convolved, trace.answer.pooled, trace.answer.flattened
        );
        println!(
            "  combined {:?} -> projected {:?} -> logits {:?} -> output {:?}",
            trace.combined, trace.projected, trace.logits, trace.output
        );
        println!("  log-probs: {:?}", traced.output.to_vec2()?);
    }

    let ranked = scorer.rank(&question_matrix, &answer_matrices, aux_rows.as_deref())?;

    println!("ranking:");
    for (position, entry) in ranked.iter().enumerate() {
        println!(
            "  {}. p(relevant)={:.4}  {}",
            position + 1,
            entry.score,
            answers[entry.index]
        );
    }

    tracing::info!("SM CNN walkthrough complete");
    Ok(())
}

fn parse_args(args: Vec<String>) -> (String, Vec<String>) {
    let mut args = args.into_iter();
    match args.next() {
        Some(question) => {
            let answers: Vec<String> = args.collect();
            if answers.is_empty() {
                let defaults = DEFAULT_ANSWERS.iter().map(|a| a.to_string()).collect();
                (question, defaults)
            } else {
                (question, answers)
            }
        }
        None => (
            DEFAULT_QUESTION.to_string(),
            DEFAULT_ANSWERS.iter().map(|a| a.to_string()).collect(),
        ),
    }
}
