mod common;

use av_core::{AvailabilityConfig, BreakdownConfig, BreakdownSources, Plant, StateSet};
use av_dists::DistSpec;
use common::{Machine, Run};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_config(rng: &mut StdRng, with_calendar: bool) -> AvailabilityConfig {
    let mut config = AvailabilityConfig::default();
    if with_calendar {
        for _ in 0..rng.gen_range(1..=3) {
            let interval = rng.gen_range(10.0..200.0);
            config.maintenance.first_times.push(rng.gen_range(0.0..100.0));
            config.maintenance.intervals.push(interval);
            config.maintenance.durations.push(rng.gen_range(1.0..=interval / 2.0));
            config.maintenance.skip_if_overlap.push(rng.gen_bool(0.3));
        }
        let n = config.maintenance.len();
        config.maintenance.force = Some((0..n).map(|_| rng.gen_bool(0.2)).collect());
        config.maintenance.defer_limits = Some(
            (0..n)
                .map(|_| if rng.gen_bool(0.5) { rng.gen_range(1.0..20.0) } else { 0.0 })
                .collect(),
        );
    }
    for _ in 0..rng.gen_range(0..=2) {
        let interval = rng.gen_range(50.0..400.0);
        config.operating_hours.first_hours.push(rng.gen_range(10.0..300.0));
        config.operating_hours.intervals.push(interval);
        config.operating_hours.durations.push(rng.gen_range(1.0..10.0));
    }
    config.breakdowns = BreakdownConfig {
        availability: rng.gen_range(0.8..=1.0),
        ..Default::default()
    };
    config
}

fn random_plant(seed: u64) -> Plant<Machine> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut plant = Plant::new(StateSet::standard());
    let n = rng.gen_range(1..=4);
    let grouped = n >= 2 && rng.gen_bool(0.5);
    for i in 0..n {
        let mut config = random_config(&mut rng, !(grouped && i == 1));
        if grouped && i == 0 {
            config.shared_maintenance = vec!["m1".to_string()];
        }
        let sources = BreakdownSources {
            duration: Some(DistSpec::Uniform { min: 1.0, max: 8.0 }.boxed(seed * 31 + i as u64).unwrap()),
            inter_arrival: None,
        };
        plant
            .add_entity(&format!("m{i}"), &config, sources, Machine::default())
            .unwrap();
    }
    plant
}

fn check(run: &Run, since_reset: f64) {
    let now = run.now();
    for m in run.plant.entities() {
        assert!(m.calendar().backlogs().iter().all(|&b| b >= 0), "{}: {:?}", m.name(), m.calendar().backlogs());
        assert!(m.operating_hours().backlogs().iter().all(|&b| b >= 0));

        let total = m.tracker().total_hours(now);
        assert!((total - (now - since_reset)).abs() < 1e-6, "{}: {total} at {now}", m.name());

        if total > 0.0 {
            let fractions: f64 = ["Idle", "Working", "Breakdown", "Maintenance"]
                .iter()
                .map(|s| m.fraction_of_time(s, now).unwrap())
                .sum();
            assert!((fractions - 1.0).abs() < 1e-9);
        }
        assert!((m.commitment(now) - (1.0 - m.fraction_of_time("Idle", now).unwrap())).abs() < 1e-12);
    }
}

#[test]
fn randomized_schedules_keep_core_invariants() {
    for seed in 0..24 {
        let mut run = Run::start(random_plant(seed), 0.5).unwrap();

        // Machines are held busy at random so backlogs build up and deferrals kick in.
        let mut toggles = StdRng::seed_from_u64(seed ^ 0x5eed);
        run.exec
            .every(3.0, 7.0, move |plant: &mut Plant<Machine>, _| {
                let ids: Vec<_> = plant.entities().map(|e| e.id()).collect();
                for id in ids {
                    plant.entity_mut(id)?.behavior_mut().busy = toggles.gen_bool(0.4);
                }
                Ok(())
            })
            .unwrap();

        let mut reset_at = 0.0;
        for step in 1..=40 {
            let horizon = step as f64 * 50.0;
            run.until(horizon).unwrap();
            check(&run, reset_at);
            if step == 20 {
                run.plant.clear_statistics(horizon);
                reset_at = horizon;
                check(&run, reset_at);
            }
        }
    }
}
