use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use heat_core::mocks::{SimBus, SimDevice};
use heat_core::{DeviceAddress, SearchState, Temperature};

fn bench_discovery(c: &mut Criterion) {
    c.bench_function("enumerate_8_devices", |b| {
        let devices: Vec<SimDevice> = (0u8..8)
            .map(|i| {
                SimDevice::new(
                    DeviceAddress::with_valid_crc([0x28, i, 0xA0, 0x55, i ^ 0x0F, 0x00, i]),
                    Temperature::from_celsius(25),
                )
            })
            .collect();
        b.iter(|| {
            let mut bus = SimBus::new(devices.clone());
            let mut search = SearchState::new();
            let mut found = 0usize;
            loop {
                search.advance(&mut bus).unwrap();
                found += 1;
                if search.is_done() {
                    break;
                }
            }
            black_box(found)
        })
    });
}

criterion_group!(benches, bench_discovery);
criterion_main!(benches);
