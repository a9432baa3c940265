mod common;

use av_core::{AvailabilityConfig, BreakdownSources, Plant, StateSet};
use common::{calendar, Machine, Run};

#[test]
fn group_enters_maintenance_together_once_all_are_available() {
    let mut plant = Plant::new(StateSet::standard());
    let mut master = calendar(&[5.0], &[50.0], &[4.0]);
    master.shared_maintenance = vec!["follower".to_string()];
    let a = plant
        .add_entity("leader", &master, BreakdownSources::default(), Machine::default())
        .unwrap();
    let busy = Machine {
        busy: true,
        ..Default::default()
    };
    let b = plant
        .add_entity("follower", &AvailabilityConfig::default(), BreakdownSources::default(), busy)
        .unwrap();
    let mut run = Run::start(plant, 1.0).unwrap();

    run.until(50.0).unwrap();
    for id in [a, b] {
        let m = run.plant.entity(id).unwrap();
        assert!(!m.is_in_maintenance());
        assert_eq!(m.calendar().backlog(0), 1);
    }

    run.until(60.0).unwrap();
    assert_eq!(run.plant.entity(a).unwrap().calendar().backlog(0), 2);
    assert_eq!(run.plant.entity(b).unwrap().calendar().backlog(0), 2);
    assert!(run.plant.entity(b).unwrap().has_service_scheduled());

    run.plant.entity_mut(b).unwrap().behavior_mut().busy = false;
    run.until(100.0).unwrap();
    for id in [a, b] {
        let m = run.plant.entity(id).unwrap();
        assert_eq!(m.maintenance_start_time(), 61.0);
        assert_eq!(m.maintenance_end_time(), 69.0);
        assert_eq!(m.hours_for_state("Maintenance", 100.0).unwrap(), 8.0);
        assert_eq!(m.calendar().backlog(0), 0);
    }

    run.until(110.0).unwrap();
    for id in [a, b] {
        assert_eq!(run.plant.entity(id).unwrap().maintenance_start_time(), 105.0);
    }
}

#[test]
fn unknown_member_stops_initialization() {
    let mut plant: Plant<Machine> = Plant::new(StateSet::standard());
    let mut master = calendar(&[5.0], &[50.0], &[4.0]);
    master.shared_maintenance = vec!["nobody".to_string()];
    plant
        .add_entity("leader", &master, BreakdownSources::default(), Machine::default())
        .unwrap();
    assert!(Run::start(plant, 1.0).is_err());
}
