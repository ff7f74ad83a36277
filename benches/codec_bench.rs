use criterion::{black_box, criterion_group, criterion_main, Criterion};
use id3forge::frame::{CommentFrame, PictureFrame, UserTextFrame};
use id3forge::{unsync, Frame, FrameBody, PictureType, Tag, TextEncoding, Version};

fn sample_tag() -> Tag {
    let mut tag = Tag::new(Version::V2_4);
    for (id, value) in [("TIT2", "Title"), ("TPE1", "Artist"), ("TALB", "Album"), ("TRCK", "3/12")] {
        tag.add_frame(Frame::text(id, value).unwrap());
    }
    tag.add_frame(Frame::new("TXXX", FrameBody::UserText(UserTextFrame::new("REPLAYGAIN_TRACK_GAIN", "-6.50 dB"))).unwrap());
    tag.add_frame(Frame::new("COMM", FrameBody::Comment(CommentFrame::new(*b"eng", "", "bench"))).unwrap());
    tag.add_frame(Frame::new("APIC", FrameBody::Picture(PictureFrame {
        encoding:     TextEncoding::Latin1,
        mime_type:    "image/jpeg".into(),
        picture_type: PictureType::CoverFront,
        description:  String::new(),
        data:         (0..=255u8).cycle().take(256 * 1024).collect(),
    })).unwrap());
    tag
}

fn bench_tag(c: &mut Criterion) {
    let tag = sample_tag();
    let v24 = tag.render(Version::V2_4).unwrap();

    c.bench_function("render_v24_256k_picture", |b| b.iter(|| black_box(&tag).render(Version::V2_4).unwrap()));
    c.bench_function("render_v23_256k_picture", |b| b.iter(|| black_box(&tag).render(Version::V2_3).unwrap()));
    c.bench_function("parse_v24_256k_picture", |b| b.iter(|| Tag::parse(black_box(&v24)).unwrap()));
}

fn bench_unsync(c: &mut Criterion) {
    let data: Vec<u8> = (0..=255u8).cycle().take(1024 * 1024).collect();
    let stuffed = unsync::insert(&data);

    c.bench_function("unsync_insert_1mb", |b| b.iter(|| unsync::insert(black_box(&data))));
    c.bench_function("unsync_remove_1mb", |b| b.iter(|| unsync::remove(black_box(&stuffed))));
}

criterion_group!(benches, bench_tag, bench_unsync);
criterion_main!(benches);
