//! End-to-end pipeline tests: notations through batching through the
//! encoder.

use enlace::featurize::{bond_fdim, onek_encoding_unk, ATOM_FDIM};
use enlace::graph::{BatchOptions, GraphBuilder};
use enlace::mpn::{DatasetKind, Mpn, MpnConfig, MpnPredictor};
use enlace::nn::Activation;
use enlace::EnlaceError;

use proptest::prelude::*;

fn config() -> MpnConfig {
    MpnConfig::default().with_hidden_size(16).with_seed(1234)
}

#[test]
fn encode_mixed_batch() {
    let mut builder = GraphBuilder::new(BatchOptions::default());
    let graph = builder
        .mol2graph(&["C", "CCO", "c1ccccc1", "CC(=O)Nc1ccc(O)cc1"])
        .unwrap();
    graph.validate();

    let mpn = Mpn::new(config()).unwrap();
    let out = mpn.forward(&graph);
    assert_eq!(out.shape(), &[4, 16]);
    assert!(out.data().iter().all(|x| x.is_finite()));
}

#[test]
fn every_mode_combination_encodes() {
    for add_hs in [false, true] {
        for three_d in [false, true] {
            for virtual_edges in [false, true] {
                let options = BatchOptions {
                    add_hs,
                    three_d,
                    virtual_edges,
                    embed_seed: 5,
                };
                let mut builder = GraphBuilder::new(options);
                let graph = builder.mol2graph(&["CCO", "C=C"]).unwrap();
                graph.validate();
                assert_eq!(
                    graph.fbonds.shape()[1],
                    ATOM_FDIM + bond_fdim(three_d, virtual_edges)
                );

                let mut mpn_config = config();
                mpn_config.three_d = three_d;
                mpn_config.virtual_edges = virtual_edges;
                let mpn = Mpn::new(mpn_config).unwrap();
                let out = mpn.forward(&graph);
                assert_eq!(out.shape(), &[2, 16]);
                assert!(out.data().iter().all(|x| x.is_finite()));
            }
        }
    }
}

#[test]
fn identical_notations_share_cached_features() {
    let mut builder = GraphBuilder::new(BatchOptions::default());
    let graph = builder.mol2graph(&["CCO", "CCO"]).unwrap();
    assert_eq!(builder.cached_molecules(), 1);
    // Both copies contribute identical rows.
    let (o1, l1) = graph.scope[0];
    let (o2, l2) = graph.scope[1];
    assert_eq!(l1, l2);
    for i in 0..l1 {
        assert_eq!(graph.fatoms.row(o1 + i), graph.fatoms.row(o2 + i));
    }
}

#[test]
fn separate_builders_agree() {
    let mpn = Mpn::new(config()).unwrap();
    let a = GraphBuilder::new(BatchOptions::default())
        .mol2graph(&["CC(C)C"])
        .unwrap();
    let b = GraphBuilder::new(BatchOptions::default())
        .mol2graph(&["CC(C)C"])
        .unwrap();
    assert_eq!(mpn.forward(&a).data(), mpn.forward(&b).data());
}

#[test]
fn depth_changes_the_encoding() {
    let mut builder = GraphBuilder::new(BatchOptions::default());
    let graph = builder.mol2graph(&["CCCCO"]).unwrap();
    let shallow = Mpn::new(config().with_depth(1)).unwrap().forward(&graph);
    let deep = Mpn::new(config().with_depth(4)).unwrap().forward(&graph);
    assert_ne!(shallow.data(), deep.data());
}

#[test]
fn attention_variants_agree_on_shape() {
    let mut builder = GraphBuilder::new(BatchOptions::default());
    let graph = builder.mol2graph(&["c1ccc2ccccc2c1", "CCO"]).unwrap();
    for (msg, slf) in [(false, false), (true, false), (false, true), (true, true)] {
        let mpn = Mpn::new(
            config()
                .with_message_attention(msg)
                .with_self_attention(slf),
        )
        .unwrap();
        let out = mpn.forward(&graph);
        assert_eq!(out.shape(), &[2, 16]);
        assert!(out.data().iter().all(|x| x.is_finite()));
    }
}

#[test]
fn activations_all_run() {
    let mut builder = GraphBuilder::new(BatchOptions::default());
    let graph = builder.mol2graph(&["CCO"]).unwrap();
    for act in [
        Activation::ReLU,
        Activation::LeakyReLU,
        Activation::PReLU,
        Activation::Tanh,
    ] {
        let mpn = Mpn::new(config().with_activation(act)).unwrap();
        assert!(mpn.forward(&graph).data().iter().all(|x| x.is_finite()));
    }
}

#[test]
fn predictor_end_to_end() {
    let mut builder = GraphBuilder::new(BatchOptions::default());
    let graph = builder.mol2graph(&["CCO", "CCN", "CCC"]).unwrap();
    let predictor = MpnPredictor::new(config(), 2, DatasetKind::Classification).unwrap();
    let out = predictor.forward(&graph);
    assert_eq!(out.shape(), &[3, 2]);
    assert!(out.data().iter().all(|&p| (0.0..=1.0).contains(&p)));
}

#[test]
fn malformed_notation_fails_whole_batch() {
    let mut builder = GraphBuilder::new(BatchOptions::default());
    let err = builder.mol2graph(&["CCO", "C1CC"]).unwrap_err();
    assert!(matches!(err, EnlaceError::Parse { .. }));
}

#[test]
fn train_mode_applies_dropout_eval_does_not() {
    let mut builder = GraphBuilder::new(BatchOptions::default());
    let graph = builder.mol2graph(&["CCCCCCCC"]).unwrap();
    let mut mpn = Mpn::new(config().with_dropout(0.5)).unwrap();

    let eval_a = mpn.forward(&graph);
    let eval_b = mpn.forward(&graph);
    assert_eq!(eval_a.data(), eval_b.data());

    mpn.train();
    let train_a = mpn.forward(&graph);
    let train_b = mpn.forward(&graph);
    assert_ne!(train_a.data(), train_b.data());

    mpn.eval();
    let eval_c = mpn.forward(&graph);
    assert_eq!(eval_a.data(), eval_c.data());
}

proptest! {
    #[test]
    fn onek_always_one_hot(value in -50i64..150, len in 1usize..20) {
        let choices: Vec<i64> = (0..len as i64).collect();
        let encoding = onek_encoding_unk(value, &choices);
        prop_assert_eq!(encoding.len(), len + 1);
        prop_assert_eq!(encoding.iter().filter(|&&x| x == 1.0).count(), 1);
        prop_assert_eq!(encoding.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn alkane_chains_encode(len in 1usize..12) {
        let notation = "C".repeat(len);
        let mut builder = GraphBuilder::new(BatchOptions::default());
        let graph = builder.mol2graph(&[notation]).unwrap();
        graph.validate();
        prop_assert_eq!(graph.n_atoms(), len);
        prop_assert_eq!(graph.n_bonds(), 2 * (len - 1));

        let mpn = Mpn::new(config()).unwrap();
        let out = mpn.forward(&graph);
        prop_assert_eq!(out.shape(), &[1, 16]);
        prop_assert!(out.data().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn batch_order_never_changes_rows(swap in proptest::bool::ANY) {
        let notations = if swap {
            ["c1ccccc1", "CCO"]
        } else {
            ["CCO", "c1ccccc1"]
        };
        let mut builder = GraphBuilder::new(BatchOptions::default());
        let graph = builder.mol2graph(&notations).unwrap();
        let mut alone = GraphBuilder::new(BatchOptions::default());
        for (m, notation) in notations.iter().enumerate() {
            let single = alone.mol2graph(&[notation]).unwrap();
            let (offset, len) = graph.scope[m];
            prop_assert_eq!(len, single.n_atoms());
            for i in 0..len {
                prop_assert_eq!(single.fatoms.row(i), graph.fatoms.row(offset + i));
            }
        }
    }
}
