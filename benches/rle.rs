use criterion::{black_box, criterion_group, criterion_main, Criterion};
use delve::{compress, decompress, Position, RoomData, SerializedRoomData};

fn large_room() -> RoomData {
    let mut room = RoomData::new("bench", 24, 24);
    for layer in 0..3 {
        for y in -12..12 {
            for x in -12..12 {
                let address = if (x + y + layer) % 5 == 0 { "deco/moss" } else { "floor/stone" };
                room.add_tile(address, layer, Position::new(x, y));
            }
        }
    }
    room
}

fn bench_rle(c: &mut Criterion) {
    let room = large_room();
    let runs = compress(&room.tiles);

    c.bench_function("compress 24x24x3", |b| b.iter(|| compress(black_box(&room.tiles))));
    c.bench_function("decompress 24x24x3", |b| b.iter(|| decompress(black_box(&runs))));
    c.bench_function("serialize room json", |b| {
        b.iter(|| SerializedRoomData::from_room_data(black_box(&room)).to_json())
    });
}

criterion_group!(benches, bench_rle);
criterion_main!(benches);
