//! End-to-end test for the bundled meeting room scenario.
//!
//! Five users share a whiteboard and a handful of personal laptops, tablets, phones
//! and watches. The per-user importance overrides should dominate the element
//! defaults:
//!
//! - the secretary cares most about editing the minutes, which have a default
//!   importance of zero, so they land on the secretary's laptop
//! - the manager's calendar override pulls the calendar onto the manager's laptop

use mosaic::scenarios::Scenario;
use testresult::TestResult;

fn meeting_room() -> Result<Scenario, Box<dyn std::error::Error>> {
    let base = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios");

    Ok(Scenario::from_set_in(base, "meeting_room")?)
}

#[test]
fn meeting_room_scenario_loads_every_definition() -> TestResult {
    let scenario = meeting_room()?;

    assert_eq!(scenario.name(), "meeting_room");
    assert_eq!(scenario.elements().len(), 9);
    assert_eq!(scenario.devices().len(), 12);
    assert_eq!(scenario.users().len(), 5);

    let manager = scenario
        .users()
        .iter()
        .find(|user| user.name() == "manager")
        .ok_or("manager missing")?;

    assert!(
        manager
            .importance_of("Calendar")
            .is_some_and(|importance| (importance - 20.0).abs() < f64::EPSILON),
        "manager's calendar override missing"
    );

    Ok(())
}

#[test]
fn user_overrides_decide_personal_laptops() -> TestResult {
    let scenario = meeting_room()?;
    let result = scenario.optimize()?;
    let assignment = result.assignment();

    assert!(
        result.status().is_some_and(|status| status.is_optimal()),
        "expected an optimal solve, got {:?}",
        result.status()
    );

    assert!(
        assignment.is_placed("Meeting Minutes (edit)", "Laptop (secretary)"),
        "minutes not on the secretary's laptop: {assignment:?}"
    );
    assert!(
        assignment.is_placed("Calendar", "Laptop (manager)"),
        "calendar not on the manager's laptop: {assignment:?}"
    );

    Ok(())
}

#[test]
fn meeting_room_assignment_respects_capacity_and_sizes() -> TestResult {
    let scenario = meeting_room()?;
    let result = scenario.optimize()?;

    assert_eq!(result.assignment().devices().len(), scenario.devices().len());

    for slot in result.assignment().devices() {
        let device = slot.device();

        assert!(
            slot.occupied_area() <= device.area(),
            "{} is over capacity",
            device.name()
        );

        for placed in slot.elements() {
            let element = placed.element();
            let upper = element.max_area().min(device.area());

            assert!(
                (element.min_area()..=upper).contains(&placed.occupied_size()),
                "{} on {} has size {}",
                element.name(),
                device.name(),
                placed.occupied_size()
            );
        }
    }

    let min_ratio = result.coverage().min_ratio();

    assert!((0.0..=1.0).contains(&min_ratio), "min ratio {min_ratio} out of range");

    Ok(())
}
