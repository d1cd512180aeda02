//! Whole-document integration tests: build a small PDF by hand, push it
//! through `Document`, and check what comes back out survives a round
//! trip through disk. `RUST_LOG=pdfgraph=debug cargo test` surfaces the
//! same parser/xref decisions logged during a real `Document::open`.

use crate::dictionary::Dictionary;
use crate::document::Document;
use crate::object::Object;
use crate::writer::{WriteMode, WriterOptions};

fn minimal_pdf() -> Vec<u8> {
    let body = "%PDF-1.5\n\
1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n\
2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj\n\
3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]>>endobj\n";
    let xref_offset = body.len();
    let mut out = body.as_bytes().to_vec();
    out.extend_from_slice(
        b"xref\n0 4\n\
0000000000 65535 f \n\
0000000009 00000 n \n\
0000000055 00000 n \n\
0000000106 00000 n \n\
trailer\n<</Root 1 0 R/Size 4>>\nstartxref\n",
    );
    out.extend_from_slice(format!("{xref_offset}\n%%EOF").as_bytes());
    out
}

#[test]
fn opens_a_hand_built_document_and_resolves_the_catalog() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut doc = Document::load_mem(&minimal_pdf()).unwrap();
    assert_eq!(doc.version(), (1, 5));

    let catalog = doc.catalog().unwrap();
    assert!(catalog.has_type(b"Catalog"));
}

#[test]
fn round_trips_through_a_temp_file() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut doc = Document::load_mem(&minimal_pdf()).unwrap();

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("roundtrip.pdf");
    let mut file = std::fs::File::create(&path).unwrap();
    doc.write(&mut file, WriteMode::Full, &WriterOptions::default()).unwrap();
    drop(file);

    let mut reloaded = Document::open(&path).unwrap();
    let catalog = reloaded.catalog().unwrap();
    assert!(catalog.has_type(b"Catalog"));
}

#[test]
fn new_document_gains_an_object_and_writes_it_back_out() {
    let mut doc = Document::new();
    let mut page_dict = Dictionary::new();
    let media_box = vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)];
    page_dict.set("MediaBox", Object::Array(media_box));
    let page = doc.wrap(Object::Dictionary(page_dict), Some("Page"));
    let page_id = page.as_reference().unwrap();

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Kids", Object::Array(vec![page.clone()]));
    pages_dict.set("Count", Object::Integer(1));
    let pages = doc.wrap(Object::Dictionary(pages_dict), Some("Pages"));
    let pages_id = pages.as_reference().unwrap();

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Pages", pages.clone());
    let catalog = doc.wrap(Object::Dictionary(catalog_dict), Some("Catalog"));
    doc.trailer_mut().set("Root", catalog);

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("built.pdf");
    let mut file = std::fs::File::create(&path).unwrap();
    doc.write(&mut file, WriteMode::Full, &WriterOptions::default()).unwrap();
    drop(file);

    let mut reloaded = Document::open(&path).unwrap();
    let page_obj = reloaded.object(page_id).unwrap();
    assert!(page_obj.as_dict().unwrap().has_type(b"Page"));
    let pages_obj = reloaded.object(pages_id).unwrap();
    assert!(pages_obj.as_dict().unwrap().has_type(b"Pages"));
}

#[test]
fn incremental_write_preserves_the_original_bytes() {
    let original = minimal_pdf();
    let mut doc = Document::load_mem(&original).unwrap();
    let extra = doc.add(Object::Integer(42));
    doc.trailer_mut().set("Extra", extra.clone());

    let mut out = Vec::new();
    doc.write(&mut out, WriteMode::Incremental(&original), &WriterOptions::default()).unwrap();
    assert!(out.starts_with(&original));

    let mut reloaded = Document::load_mem(&out).unwrap();
    assert_eq!(reloaded.trailer().get(b"Extra").unwrap().as_i64().unwrap(), 42);
}
