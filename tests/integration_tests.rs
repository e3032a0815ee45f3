//! End-to-end solver assembly and runs


use fittd::domain::mesh::UniformMesh;
use fittd::error::SolverError;
use fittd::prelude::*;
use test_utils::CELL;

fn cavity_builder(dims: [usize; 3], settings: SolverSettings) -> SolverBuilder {
    let mesh = UniformMesh::homogeneous(dims, [CELL; 3]).with_pec_hull();
    SolverBuilder::new(dims, settings)
        .primal(mesh.surface_discretization(), mesh.edge_discretization())
        .materials(mesh.material_properties())
}

fn band_signal() -> SignalSpec {
    SignalSpec {
        name: "band".into(),
        min_frequency: 1e9,
        max_frequency: 10e9,
    }
}

fn feed_port(coordinate: [usize; 3]) -> PortSpec {
    PortSpec {
        name: "feed".into(),
        field: FieldKind::Electric,
        axis: Axis::X,
        signal: "band".into(),
        coordinate: Some(coordinate),
        mode: ApplyMode::Additive,
    }
}

fn probe_monitor(coordinate: [usize; 3], interval: u64) -> MonitorSpec {
    MonitorSpec {
        name: "probe".into(),
        field: FieldKind::Electric,
        domain: PipelineDomain::Time,
        geometry: MonitorGeometry::Edge,
        quantity: MonitorQuantity::Component(Axis::X),
        volume: MonitorVolume::Point(coordinate),
        sample_interval: interval,
        frequency: None,
        timesteps: None,
    }
}

#[test]
fn test_builder_rejects_missing_ports_and_signals() {
    let settings = SolverSettings::default();
    let err = cavity_builder([8, 8, 8], settings.clone()).build();
    assert!(matches!(err, Err(SolverError::NoPorts)));

    let err = cavity_builder([8, 8, 8], settings)
        .port(feed_port([4, 4, 4]))
        .build();
    assert!(matches!(err, Err(SolverError::NoSignals)));
}

#[test]
fn test_builder_rejects_multiple_ports_for_frequency_capture() {
    let monitor = MonitorSpec {
        name: "capture".into(),
        field: FieldKind::Electric,
        domain: PipelineDomain::Frequency,
        geometry: MonitorGeometry::Edge,
        quantity: MonitorQuantity::Component(Axis::X),
        volume: MonitorVolume::Full,
        sample_interval: 2,
        frequency: Some(5e9),
        timesteps: None,
    };
    let err = cavity_builder([8, 8, 8], SolverSettings::default())
        .signal(band_signal())
        .port(feed_port([3, 4, 4]))
        .port(PortSpec {
            name: "second".into(),
            ..feed_port([5, 4, 4])
        })
        .monitor(monitor)
        .build();
    assert!(matches!(
        err,
        Err(SolverError::MultiplePortsForFrequencyCapture(2))
    ));
}

#[test]
fn test_builder_rejects_unsupported_alignment() {
    let settings = SolverSettings {
        alignment: 24,
        ..SolverSettings::default()
    };
    let err = cavity_builder([8, 8, 8], settings)
        .signal(band_signal())
        .port(feed_port([4, 4, 4]))
        .build();
    assert!(matches!(err, Err(SolverError::UnsupportedAlignment(24))));
}

#[test]
fn test_builder_rejects_all_boundary_grid() {
    let dims = [6, 6, 6];
    let zeros = ndarray::Array3::from_elem((6, 6, 6), 0.0);
    let mesh = UniformMesh::with_materials(dims, [CELL; 3], zeros.clone(), zeros).unwrap();
    let err = SolverBuilder::new(dims, SolverSettings::default())
        .primal(mesh.surface_discretization(), mesh.edge_discretization())
        .materials(mesh.material_properties())
        .signal(band_signal())
        .port(feed_port([3, 3, 3]))
        .build();
    assert!(matches!(err, Err(SolverError::AllBoundaryNodes)));
}

#[test]
fn test_builder_rejects_flat_grid() {
    let dims = [8, 8, 1];
    let err = cavity_builder(dims, SolverSettings::default())
        .signal(band_signal())
        .port(feed_port([4, 4, 0]))
        .build();
    assert!(matches!(err, Err(SolverError::NotThreeDimensional(_))));
}

#[test]
fn test_builder_rejects_size_mismatch() {
    let small = UniformMesh::homogeneous([4, 4, 4], [CELL; 3]);
    let err = SolverBuilder::new([8, 8, 8], SolverSettings::default())
        .primal(small.surface_discretization(), small.edge_discretization())
        .materials(small.material_properties())
        .signal(band_signal())
        .port(feed_port([4, 4, 4]))
        .build();
    assert!(matches!(err, Err(SolverError::SizeMismatch { .. })));
}

#[test]
fn test_cavity_run_produces_results_and_summary() {
    let dims = [20, 20, 20];
    let total = 400;
    let settings = SolverSettings {
        total_timesteps: total,
        threads: 2,
        ..SolverSettings::default()
    };
    let mut solver = cavity_builder(dims, settings)
        .signal(band_signal())
        .port(feed_port([10, 10, 10]))
        .monitor(probe_monitor([14, 10, 10], 4))
        .monitor(MonitorSpec {
            name: "capture".into(),
            field: FieldKind::Electric,
            domain: PipelineDomain::Frequency,
            geometry: MonitorGeometry::Node,
            quantity: MonitorQuantity::Vector,
            volume: MonitorVolume::Full,
            sample_interval: 8,
            frequency: Some(5.5e9),
            timesteps: None,
        })
        .build()
        .unwrap();

    let summary = solver.run();
    assert_eq!(summary.simulated_timesteps, total);
    assert_eq!(summary.node_count, 20 * 20 * 20);
    assert!(summary.time_step > 0.0);
    assert_eq!(summary.ports.len(), 1);
    assert_eq!(summary.monitors.len(), 2);
    let text = summary.to_string();
    assert!(text.contains("feed"));
    assert!(text.contains("probe"));

    let results = solver.into_results();
    assert_eq!(results.len(), 2);

    let SinkOutput::TimeSeries(series) = &results[0].output else {
        panic!("expected the probe series first");
    };
    assert_eq!(series.entries.len(), (total as usize).div_ceil(4));
    let peak = series
        .entries
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f32, |m, &v| m.max(v.abs()));
    assert!(peak > 0.0, "the pulse never reached the probe");

    let SinkOutput::Snapshot(snapshot) = &results[1].output else {
        panic!("expected the field capture second");
    };
    assert_eq!(snapshot.extents, [20, 20, 20]);
    assert_eq!(snapshot.channels.len(), 3);
    let energy: f64 = snapshot
        .channels
        .iter()
        .flat_map(|ch| ch.iter())
        .map(|c| c.norm_sqr() as f64)
        .sum();
    assert!(energy > 0.0);
}

#[test]
fn test_thread_count_does_not_change_the_result() {
    let dims = [16, 16, 16];
    let total = 120;
    let run = |threads: usize| {
        let settings = SolverSettings {
            total_timesteps: total,
            threads,
            ..SolverSettings::default()
        };
        let mut solver = cavity_builder(dims, settings)
            .signal(band_signal())
            .port(feed_port([8, 8, 8]))
            .monitor(probe_monitor([11, 8, 8], 1))
            .build()
            .unwrap();
        solver.run();
        let results = solver.into_results();
        let SinkOutput::TimeSeries(series) = results.into_iter().next().unwrap().output else {
            panic!("expected a series");
        };
        series
    };

    let serial = run(1);
    let parallel = run(4);
    assert_eq!(serial.entries.len(), parallel.entries.len());
    for (a, b) in serial.entries.iter().zip(parallel.entries.iter()) {
        assert_eq!(a, b, "thread partitioning changed the field evolution");
    }
}

#[test]
fn test_port_default_coordinate_is_grid_center() {
    let dims = [10, 10, 10];
    let settings = SolverSettings {
        total_timesteps: 4,
        threads: 1,
        ..SolverSettings::default()
    };
    let solver = cavity_builder(dims, settings)
        .signal(band_signal())
        .port(PortSpec {
            coordinate: None,
            ..feed_port([0, 0, 0])
        })
        .build()
        .unwrap();
    let summary = solver.summary();
    assert!(summary.ports[0].contains("[5, 5, 5]"));
}
