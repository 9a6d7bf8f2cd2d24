use heat_core::actuator::{overlap_plan, ActuatorCommand, Direction};
use heat_core::{DeviceAddress, Regulator, RegulatorCfg};
use proptest::prelude::*;

proptest! {
    #[test]
    fn crc_validates_iff_untampered(payload in prop::array::uniform7(any::<u8>()), bit in 0usize..64) {
        let addr = DeviceAddress::with_valid_crc(payload);
        prop_assert!(addr.is_crc_valid());

        let mut bytes = *addr.bytes();
        bytes[bit / 8] ^= 1 << (bit % 8);
        prop_assert!(!DeviceAddress::new(bytes).is_crc_valid());
    }

    #[test]
    fn regulator_never_leaves_its_bounds(currents in prop::collection::vec(-800i32..800, 1..60)) {
        let cfg = RegulatorCfg {
            gain_p: 3,
            gain_i: 2,
            gain_d: 5,
            output_max: 4000,
            output_min: -4000,
            large_error: 300,
            integral_div: 8,
            integral_limit_div: 4,
            derivative_div: 2,
            smooth_output: false,
        };
        let mut reg = Regulator::new(cfg, 0);
        for c in currents {
            let out = reg.step(c);
            prop_assert!((-4000..=4000).contains(&out), "output {out} escaped bounds");
            prop_assert!(reg.integral().abs() <= 1000, "integral {} escaped clamp", reg.integral());
        }
    }

    #[test]
    fn overlap_plan_conserves_hold_times(a in 0u32..10_000, b in 0u32..10_000) {
        let plan = overlap_plan(
            ActuatorCommand { direction: Direction::Up, hold_ms: a },
            ActuatorCommand { direction: Direction::Down, hold_ms: b },
        );
        prop_assert_eq!(plan.joint_ms, a.min(b));
        prop_assert_eq!(plan.joint_ms + plan.remainder_ms, a.max(b));
    }
}
