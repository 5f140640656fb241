use super::*;
use candle_core::{DType, Device, Tensor};
use std::collections::HashMap;
use std::sync::Arc;

fn small_config() -> ModelConfig {
    ModelConfig::reference()
        .with_embedding_dim(6)
        .with_filter_width(3)
        .with_channel_count(4)
        .with_aux_features(2)
}

fn small_model(config: ModelConfig) -> SmCnn {
    let params = ModelParameters::seeded(config, 7, &Device::Cpu).expect("seeded params");
    SmCnn::new(params).expect("model")
}

fn ramp(batch: usize, dim: usize, seq_len: usize) -> TokenMatrix {
    let n = batch * dim * seq_len;
    let data: Vec<f32> = (0..n).map(|i| ((i % 11) as f32 - 5.0) / 10.0).collect();
    let tensor = Tensor::from_vec(data, (batch, dim, seq_len), &Device::Cpu).unwrap();
    TokenMatrix::new(tensor).unwrap()
}

fn row_sums(log_probs: &Tensor) -> Vec<f32> {
    log_probs
        .exp()
        .unwrap()
        .to_vec2::<f32>()
        .unwrap()
        .iter()
        .map(|row| row.iter().sum())
        .collect()
}

mod config_tests {
    use super::*;

    #[test]
    fn test_reference_config_widths() {
        let config = ModelConfig::reference();
        assert_eq!(config.embedding_dim, 50);
        assert_eq!(config.filter_width, 5);
        assert_eq!(config.channel_count, 100);
        assert_eq!(config.aux_feature_count, 4);
        assert_eq!(config.class_count, 2);
        assert!(config.use_aux_features);
        assert_eq!(config.concat_width(), 204);
        assert_eq!(config.hidden_width(), 204);
        assert_eq!(config.conv_output_len(5), 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabling_aux_shrinks_widths() {
        let config = ModelConfig::reference().without_aux_features();
        assert_eq!(config.effective_aux_feature_count(), 0);
        assert_eq!(config.concat_width(), 200);
        assert_eq!(config.hidden_width(), 200);
        assert_eq!(
            ModelConfig::reference().concat_width() - config.concat_width(),
            config.aux_feature_count
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ModelConfig::reference().with_filter_width(0).validate().is_err());
        assert!(ModelConfig::reference().with_channel_count(0).validate().is_err());
        assert!(ModelConfig::reference().with_class_count(1).validate().is_err());
        assert!(ModelConfig::reference().with_aux_features(0).validate().is_err());
        assert!(ModelConfig::reference().with_dropout(1.0).validate().is_err());

        let mut config = ModelConfig::reference();
        config.format_version = 99;
        let err = config.validate().unwrap_err();
        assert!(err.contains("format_version"));
    }

    #[test]
    fn test_config_json_defaults_optional_fields() {
        let json = r#"{
            "format_version": 1,
            "embedding_dim": 50,
            "filter_width": 5,
            "channel_count": 100,
            "aux_feature_count": 4,
            "class_count": 2,
            "use_aux_features": false
        }"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.dropout, crate::constants::DEFAULT_DROPOUT);
        assert_eq!(config.activation, ActivationKind::Tanh);
        assert!(!config.use_aux_features);
    }

    #[test]
    fn test_config_json_requires_structural_fields() {
        let json = r#"{ "format_version": 1, "embedding_dim": 50 }"#;
        assert!(serde_json::from_str::<ModelConfig>(json).is_err());
    }
}

mod strategy_tests {
    use super::*;

    #[test]
    fn test_activations_are_bounded() {
        let xs = Tensor::new(&[-1000f32, -2.0, 0.0, 2.0, 1000.0], &Device::Cpu).unwrap();
        for activation in [ActivationKind::Tanh.build(), ActivationKind::Softsign.build()] {
            let ys = activation.apply(&xs).unwrap().to_vec1::<f32>().unwrap();
            assert!(ys.iter().all(|y| (-1.0..=1.0).contains(y)), "{}", activation.name());
            assert_eq!(ys[2], 0.0);
        }
    }

    #[test]
    fn test_softsign_values() {
        let xs = Tensor::new(&[-3f32, 1.0], &Device::Cpu).unwrap();
        let ys = Softsign.apply(&xs).unwrap().to_vec1::<f32>().unwrap();
        assert!((ys[0] + 0.75).abs() < 1e-6);
        assert!((ys[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_dropout_identity_in_inference() {
        let dropout = Dropout::new(0.5).unwrap();
        let xs = Tensor::ones((3, 8), DType::F32, &Device::Cpu).unwrap();
        let ys = dropout.apply(&xs, ExecutionMode::Inference).unwrap();
        assert_eq!(xs.to_vec2::<f32>().unwrap(), ys.to_vec2::<f32>().unwrap());
    }

    #[test]
    fn test_dropout_training_zeroes_or_rescales() {
        let dropout = Dropout::new(0.5).unwrap();
        let xs = Tensor::ones((16, 64), DType::F32, &Device::Cpu).unwrap();
        let ys = dropout
            .apply(&xs, ExecutionMode::Training)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        assert!(ys.iter().all(|y| *y == 0.0 || (*y - 2.0).abs() < 1e-6));
        let zeros = ys.iter().filter(|y| **y == 0.0).count();
        assert!(zeros > 0 && zeros < ys.len());
    }

    #[test]
    fn test_dropout_rejects_invalid_probability() {
        assert!(matches!(
            Dropout::new(1.0),
            Err(ModelError::Configuration { .. })
        ));
        assert!(Dropout::new(-0.1).is_err());
        assert_eq!(Dropout::new(0.25).unwrap().probability(), 0.25);
    }

    #[test]
    fn test_no_regularization_is_identity_in_training() {
        let xs = Tensor::ones((2, 4), DType::F32, &Device::Cpu).unwrap();
        let ys = NoRegularization
            .apply(&xs, ExecutionMode::Training)
            .unwrap();
        assert_eq!(ys.to_vec2::<f32>().unwrap(), vec![vec![1.0; 4]; 2]);
    }

    #[test]
    fn test_execution_mode_default_is_inference() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Inference);
        assert!(ExecutionMode::Training.is_training());
        assert!(!ExecutionMode::Inference.is_training());
    }
}

mod branch_tests {
    use super::*;

    #[test]
    fn test_padding_and_max_pool_known_values() {
        // D=1, W=2, C=1, all-ones filter: padded [0, 1, 2, 3, 0] -> [1, 3, 5, 3], max 5.
        let weight = Tensor::ones((1, 1, 2), DType::F32, &Device::Cpu).unwrap();
        let bias = Tensor::zeros(1, DType::F32, &Device::Cpu).unwrap();
        let branch = ConvolutionBranch::new("question", weight, bias, Arc::new(Tanh)).unwrap();

        let input = TokenMatrix::from_word_vectors(
            &[vec![1.0], vec![2.0], vec![3.0]],
            1,
            &Device::Cpu,
        )
        .unwrap();
        let (out, trace) = branch.forward_traced(&input).unwrap();

        assert_eq!(trace.convolved, vec![1, 1, 4]);
        assert_eq!(trace.pooled, vec![1, 1, 1]);
        assert_eq!(out.dims(), &[1, 1]);
        let value = out.to_vec2::<f32>().unwrap()[0][0];
        assert!((value - 5f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn test_output_shape_independent_of_length() {
        let model = small_model(small_config());
        for seq_len in 1..=12 {
            let out = model.question_branch().forward(&ramp(3, 6, seq_len)).unwrap();
            assert_eq!(out.dims(), &[3, 4], "seq_len {}", seq_len);
        }
    }

    #[test]
    fn test_zero_length_is_invalid_input() {
        let model = small_model(small_config());
        let empty = TokenMatrix::zeros(1, 6, 0, &Device::Cpu).unwrap();
        assert!(matches!(
            model.answer_branch().forward(&empty),
            Err(ModelError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_empty_batch_branch_is_invalid_input() {
        let model = small_model(small_config());
        let empty = TokenMatrix::zeros(0, 6, 5, &Device::Cpu).unwrap();
        let err = model.question_branch().forward(&empty).unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput { .. }));
        assert!(err.to_string().contains("batch is empty"));
    }

    #[test]
    fn test_wrong_embedding_dim_is_invalid_input() {
        let model = small_model(small_config());
        assert!(matches!(
            model.question_branch().forward(&ramp(1, 5, 4)),
            Err(ModelError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_token_matrix_rejects_wrong_rank() {
        let flat = Tensor::zeros((2, 3), DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(
            TokenMatrix::new(flat),
            Err(ModelError::InvalidInput { .. })
        ));
        assert!(matches!(
            TokenMatrix::from_word_vectors(&[], 3, &Device::Cpu),
            Err(ModelError::InvalidInput { .. })
        ));
        assert!(TokenMatrix::from_word_vectors(&[vec![1.0, 2.0]], 3, &Device::Cpu).is_err());
    }

    #[test]
    fn test_word_vectors_layout() {
        let matrix = TokenMatrix::from_word_vectors(
            &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            2,
            &Device::Cpu,
        )
        .unwrap();
        assert_eq!(matrix.batch_size(), 1);
        assert_eq!(matrix.embedding_dim(), 2);
        assert_eq!(matrix.seq_len(), 3);
        let rows = matrix.tensor().squeeze(0).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(rows, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }
}

mod network_tests {
    use super::*;

    #[test]
    fn test_reference_scenario_shapes() {
        let model = small_model(ModelConfig::reference());
        let question = ramp(1, 50, 5);
        let answer = ramp(1, 50, 30);
        let aux = AuxFeatures::from_slice(&[0.0, 0.0, 0.0, 0.0], &Device::Cpu).unwrap();

        let (out, trace) = model
            .forward_traced(&question, &answer, Some(&aux), ExecutionMode::Inference)
            .unwrap();

        assert_eq!(trace.question.input, vec![1, 50, 5]);
        assert_eq!(trace.question.convolved, vec![1, 100, 9]);
        assert_eq!(trace.question.pooled, vec![1, 100, 1]);
        assert_eq!(trace.question.flattened, vec![1, 100]);
        assert_eq!(trace.answer.convolved, vec![1, 100, 34]);
        assert_eq!(trace.answer.flattened, vec![1, 100]);
        assert_eq!(trace.combined, vec![1, 204]);
        assert_eq!(trace.projected, vec![1, 204]);
        assert_eq!(trace.logits, vec![1, 2]);
        assert_eq!(trace.output, vec![1, 2]);
        assert_eq!(out.dims(), &[1, 2]);

        let sum = row_sums(&out)[0];
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rows_sum_to_one_for_batches() {
        let model = small_model(small_config());
        let aux = AuxFeatures::from_rows(
            &[vec![0.1, 0.2], vec![0.0, 0.0], vec![1.0, -1.0]],
            &Device::Cpu,
        )
        .unwrap();
        let out = model
            .forward(&ramp(3, 6, 4), &ramp(3, 6, 9), Some(&aux), ExecutionMode::Inference)
            .unwrap();

        assert_eq!(out.dims(), &[3, 2]);
        for sum in row_sums(&out) {
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_inference_is_deterministic() {
        let model = small_model(small_config());
        let aux = AuxFeatures::zeros(1, 2, &Device::Cpu).unwrap();
        let run = || {
            model
                .forward(&ramp(1, 6, 3), &ramp(1, 6, 7), Some(&aux), ExecutionMode::Inference)
                .unwrap()
                .to_vec2::<f32>()
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_training_mode_still_normalized() {
        let model = small_model(small_config());
        let aux = AuxFeatures::zeros(2, 2, &Device::Cpu).unwrap();
        let out = model
            .forward(&ramp(2, 6, 3), &ramp(2, 6, 5), Some(&aux), ExecutionMode::Training)
            .unwrap();
        for sum in row_sums(&out) {
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_missing_aux_is_configuration_error() {
        let model = small_model(small_config());
        let result = model.forward(&ramp(1, 6, 3), &ramp(1, 6, 3), None, ExecutionMode::Inference);
        assert!(matches!(result, Err(ModelError::Configuration { .. })));
    }

    #[test]
    fn test_unexpected_aux_is_configuration_error() {
        let model = small_model(small_config().without_aux_features());
        let aux = AuxFeatures::zeros(1, 2, &Device::Cpu).unwrap();
        let result = model.forward(
            &ramp(1, 6, 3),
            &ramp(1, 6, 3),
            Some(&aux),
            ExecutionMode::Inference,
        );
        assert!(matches!(result, Err(ModelError::Configuration { .. })));
    }

    #[test]
    fn test_aux_checked_before_inputs() {
        // A zero-length question would be InvalidInput; the aux mismatch must win.
        let model = small_model(small_config());
        let empty = TokenMatrix::zeros(1, 6, 0, &Device::Cpu).unwrap();
        let aux = AuxFeatures::zeros(1, 3, &Device::Cpu).unwrap();
        let result = model.forward(&empty, &ramp(1, 6, 3), Some(&aux), ExecutionMode::Inference);
        assert!(matches!(result, Err(ModelError::Configuration { .. })));
    }

    #[test]
    fn test_without_aux_features() {
        let model = small_model(small_config().without_aux_features());
        let (out, trace) = model
            .forward_traced(&ramp(1, 6, 2), &ramp(1, 6, 8), None, ExecutionMode::Inference)
            .unwrap();
        assert_eq!(trace.combined, vec![1, 8]);
        assert_eq!(out.dims(), &[1, 2]);
    }

    #[test]
    fn test_batch_mismatch_is_invalid_input() {
        let model = small_model(small_config());
        let aux = AuxFeatures::zeros(2, 2, &Device::Cpu).unwrap();
        let result = model.forward(
            &ramp(2, 6, 3),
            &ramp(1, 6, 3),
            Some(&aux),
            ExecutionMode::Inference,
        );
        assert!(matches!(result, Err(ModelError::InvalidInput { .. })));

        let aux = AuxFeatures::zeros(1, 2, &Device::Cpu).unwrap();
        let result = model.forward(
            &ramp(2, 6, 3),
            &ramp(2, 6, 3),
            Some(&aux),
            ExecutionMode::Inference,
        );
        assert!(matches!(result, Err(ModelError::InvalidInput { .. })));
    }

    #[test]
    fn test_empty_batch_is_invalid_input() {
        let model = small_model(small_config());
        let question = TokenMatrix::zeros(0, 6, 5, &Device::Cpu).unwrap();
        let answer = TokenMatrix::zeros(0, 6, 5, &Device::Cpu).unwrap();
        let aux = AuxFeatures::zeros(0, 2, &Device::Cpu).unwrap();

        for mode in [ExecutionMode::Inference, ExecutionMode::Training] {
            let result = model.forward(&question, &answer, Some(&aux), mode);
            assert!(matches!(result, Err(ModelError::InvalidInput { .. })));
        }
    }

    #[test]
    fn test_log_softmax_is_stable_for_large_logits() {
        let config = small_config();
        let params = ModelParameters::seeded(config.clone(), 3, &Device::Cpu).unwrap();
        let mut tensors = params.to_tensors();
        tensors.insert(
            params::CLASSIFIER_BIAS.to_string(),
            Tensor::new(&[1000f32, 0.0], &Device::Cpu).unwrap(),
        );
        let model = SmCnn::new(ModelParameters::from_tensors(config, tensors).unwrap()).unwrap();
        let aux = AuxFeatures::zeros(1, 2, &Device::Cpu).unwrap();

        let out = model
            .forward(&ramp(1, 6, 3), &ramp(1, 6, 3), Some(&aux), ExecutionMode::Inference)
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();

        assert!(out[0].iter().all(|v| v.is_finite()));
        assert!(out[0][0].abs() < 1e-3);
        assert!(out[0][1] < -900.0);
    }

    #[test]
    fn test_swapping_strategies() {
        let model = small_model(small_config())
            .with_activation(Arc::new(Softsign))
            .with_regularizer(Arc::new(NoRegularization));
        assert_eq!(model.activation().name(), "softsign");
        assert_eq!(model.regularizer().name(), "none");

        let aux = AuxFeatures::zeros(1, 2, &Device::Cpu).unwrap();
        let run = |mode| {
            model
                .forward(&ramp(1, 6, 4), &ramp(1, 6, 4), Some(&aux), mode)
                .unwrap()
                .to_vec2::<f32>()
                .unwrap()
        };
        assert_eq!(run(ExecutionMode::Training), run(ExecutionMode::Inference));
    }
}

mod params_tests {
    use super::*;

    #[test]
    fn test_seeded_is_deterministic() {
        let a = ModelParameters::seeded(small_config(), 42, &Device::Cpu).unwrap();
        let b = ModelParameters::seeded(small_config(), 42, &Device::Cpu).unwrap();
        let c = ModelParameters::seeded(small_config(), 43, &Device::Cpu).unwrap();

        let weights = |p: &ModelParameters| {
            p.projection()
                .weight
                .flatten_all()
                .unwrap()
                .to_vec1::<f32>()
                .unwrap()
        };
        assert_eq!(weights(&a), weights(&b));
        assert_ne!(weights(&a), weights(&c));
    }

    #[test]
    fn test_to_tensors_names() {
        let params = ModelParameters::seeded(small_config(), 1, &Device::Cpu).unwrap();
        let tensors = params.to_tensors();
        for name in params::TENSOR_NAMES {
            assert!(tensors.contains_key(name), "missing {}", name);
        }
        assert_eq!(tensors[params::QUESTION_CONV_WEIGHT].dims(), &[4, 6, 3]);
        assert_eq!(tensors[params::PROJECTION_WEIGHT].dims(), &[10, 10]);
        assert_eq!(tensors[params::CLASSIFIER_WEIGHT].dims(), &[2, 10]);
    }

    #[test]
    fn test_missing_tensor_is_corrupt() {
        let params = ModelParameters::seeded(small_config(), 1, &Device::Cpu).unwrap();
        let mut tensors = params.to_tensors();
        tensors.remove(params::ANSWER_CONV_BIAS);
        assert!(matches!(
            ModelParameters::from_tensors(small_config(), tensors),
            Err(ModelError::CorruptModel { .. })
        ));
    }

    #[test]
    fn test_branch_channel_disagreement_is_corrupt() {
        let params = ModelParameters::seeded(small_config(), 1, &Device::Cpu).unwrap();
        let mut tensors = params.to_tensors();
        tensors.insert(
            params::ANSWER_CONV_WEIGHT.to_string(),
            Tensor::zeros((5, 6, 3), DType::F32, &Device::Cpu).unwrap(),
        );
        let err = ModelParameters::from_tensors(small_config(), tensors).unwrap_err();
        match err {
            ModelError::CorruptModel { reason } => assert!(reason.contains("disagree")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_shape_against_config_is_corrupt() {
        let params = ModelParameters::seeded(small_config(), 1, &Device::Cpu).unwrap();
        let tensors: HashMap<String, Tensor> = params.to_tensors();
        let wider = small_config().with_aux_features(3);
        assert!(matches!(
            ModelParameters::from_tensors(wider, tensors),
            Err(ModelError::CorruptModel { .. })
        ));
    }

    #[test]
    fn test_f64_tensors_are_converted() {
        let params = ModelParameters::seeded(small_config(), 1, &Device::Cpu).unwrap();
        let tensors = params
            .to_tensors()
            .into_iter()
            .map(|(k, v)| (k, v.to_dtype(DType::F64).unwrap()))
            .collect();
        let loaded = ModelParameters::from_tensors(small_config(), tensors).unwrap();
        assert_eq!(loaded.classifier().weight.dtype(), DType::F32);
    }
}

mod loader_tests {
    use super::*;
    use crate::constants::{MODEL_CONFIG_FILENAME, MODEL_WEIGHTS_FILENAME};

    #[test]
    fn test_save_then_load_scores_identically() {
        let dir = tempfile::tempdir().unwrap();
        let params = ModelParameters::seeded(small_config(), 11, &Device::Cpu).unwrap();
        let loader = ModelLoader::new(dir.path());
        loader.save(&params).unwrap();

        assert!(dir.path().join(MODEL_CONFIG_FILENAME).exists());
        assert!(dir.path().join(MODEL_WEIGHTS_FILENAME).exists());

        let loaded = loader.load(&Device::Cpu).unwrap();
        assert_eq!(loaded.config(), params.config());

        let aux = AuxFeatures::zeros(1, 2, &Device::Cpu).unwrap();
        let score = |p: ModelParameters| {
            SmCnn::new(p)
                .unwrap()
                .forward(&ramp(1, 6, 4), &ramp(1, 6, 6), Some(&aux), ExecutionMode::Inference)
                .unwrap()
                .to_vec2::<f32>()
                .unwrap()
        };
        assert_eq!(score(params), score(loaded));
    }

    #[test]
    fn test_missing_directory() {
        let loader = ModelLoader::new("/nonexistent/smcnn/model");
        assert!(matches!(
            loader.load(&Device::Cpu),
            Err(ModelError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_weights_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_json = serde_json::to_string(&small_config()).unwrap();
        std::fs::write(dir.path().join(MODEL_CONFIG_FILENAME), config_json).unwrap();

        assert!(matches!(
            ModelLoader::new(dir.path()).load(&Device::Cpu),
            Err(ModelError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_config_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MODEL_CONFIG_FILENAME),
            r#"{ "format_version": 1, "embedding_dim": 6 }"#,
        )
        .unwrap();

        assert!(matches!(
            ModelLoader::new(dir.path()).load_config(),
            Err(ModelError::CorruptModel { .. })
        ));
    }

    #[test]
    fn test_unknown_format_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let params = ModelParameters::seeded(small_config(), 2, &Device::Cpu).unwrap();
        let loader = ModelLoader::new(dir.path());
        loader.save(&params).unwrap();

        let mut config = small_config();
        config.format_version = 2;
        std::fs::write(
            loader.config_path(),
            serde_json::to_string(&config).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            loader.load(&Device::Cpu),
            Err(ModelError::CorruptModel { .. })
        ));
    }

    #[test]
    fn test_config_disagreeing_with_weights_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let params = ModelParameters::seeded(small_config(), 2, &Device::Cpu).unwrap();
        let loader = ModelLoader::new(dir.path());
        loader.save(&params).unwrap();

        let other = small_config().with_channel_count(8);
        std::fs::write(loader.config_path(), serde_json::to_string(&other).unwrap()).unwrap();

        assert!(matches!(
            loader.load(&Device::Cpu),
            Err(ModelError::CorruptModel { .. })
        ));
    }
}
