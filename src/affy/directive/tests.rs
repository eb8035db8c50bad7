use crate::affy::bytes::{Cursor, Endianness};
use crate::affy::directive::{Directive, DirectiveKind, Directives, Field, Repeat, Slot, Width, decode, decode_str, encode_str};
use crate::affy::{AffyError, ErrorKind};

#[test]
fn parses_repeat_width_and_endianness() {
	let parsed = Directives::parse("%2hl %*Db %x %c %3fl").expect("directives parse");
	let items: Vec<Directive> = parsed.iter().copied().collect();
	assert_eq!(items.len(), 5);
	assert_eq!(
		items[0],
		Directive {
			kind: DirectiveKind::Read {
				width: Width::Short,
				endian: Endianness::Little,
				widen: false
			},
			repeat: Repeat::Fixed(2),
		}
	);
	assert_eq!(
		items[1].kind,
		DirectiveKind::Read {
			width: Width::Int,
			endian: Endianness::Big,
			widen: true
		}
	);
	assert_eq!(items[1].repeat, Repeat::Runtime);
	assert_eq!(items[2].kind, DirectiveKind::Seek);
	assert_eq!(
		items[3].kind,
		DirectiveKind::Read {
			width: Width::Byte,
			endian: Endianness::Native,
			widen: false
		}
	);
	assert_eq!(items[4].repeat, Repeat::Fixed(3));
}

#[test]
fn rejects_unknown_directives() {
	for bad in ["%q", "hl", "%", "%0h", "%2x", "%*"] {
		let err = Directives::parse(bad).expect_err(bad);
		assert_eq!(err.kind(), ErrorKind::Format, "{bad}");
	}
}

#[test]
fn two_shorts_round_trip_through_encoder() {
	let bytes = [0x05, 0x00, 0x07, 0x00];
	let mut cur = Cursor::new(&bytes);
	let decoded = decode_str(&mut cur, "%2hl", &[]).expect("decode");
	assert_eq!(decoded.processed, 1);

	let mut fields = decoded.fields();
	let x = fields.i16().expect("x");
	let y = fields.i16().expect("y");
	assert_eq!((x, y), (5, 7));

	let mut out = Vec::new();
	let processed = encode_str(&mut out, "%2hl", &[], &[Field::from_i16(x), Field::from_i16(y)]).expect("encode");
	assert_eq!(processed, 1);
	assert_eq!(out, bytes);
}

#[test]
fn widened_floats_and_mixed_order() {
	let mut bytes = Vec::new();
	bytes.extend_from_slice(&1.5_f32.to_le_bytes());
	bytes.extend_from_slice(&(-2.25_f32).to_le_bytes());
	bytes.extend_from_slice(&9_i16.to_le_bytes());
	bytes.extend_from_slice(&0x0102_0304_u32.to_be_bytes());

	let mut cur = Cursor::new(&bytes);
	let decoded = decode_str(&mut cur, "%2Dl%hl%db", &[]).expect("decode");
	assert_eq!(decoded.processed, 3);
	let mut fields = decoded.fields();
	assert_eq!(fields.f64().expect("value"), 1.5);
	assert_eq!(fields.f64().expect("stddev"), -2.25);
	assert_eq!(fields.i16().expect("pixels"), 9);
	assert_eq!(fields.u32().expect("be int"), 0x0102_0304);
	assert_eq!(cur.remaining(), 0);
}

#[test]
fn runtime_repeat_fills_one_array() {
	let bytes = [1, 0, 2, 0, 3, 0, 0xAA];
	let mut cur = Cursor::new(&bytes);
	let decoded = decode_str(&mut cur, "%*hl%c", &[3]).expect("decode");
	assert_eq!(decoded.slots().len(), 2);
	let Slot::Array(items) = &decoded.slots()[0] else {
		panic!("expected array slot");
	};
	let values: Vec<u16> = items.iter().filter_map(|item| item.as_u16()).collect();
	assert_eq!(values, vec![1, 2, 3]);
	assert_eq!(decoded.slots()[1], Slot::Value(Field::Byte(0xAA)));
}

#[test]
fn seek_directive_consumes_offset_argument() {
	let bytes = [9, 9, 9, 9, 0x2A, 0, 0, 0];
	let mut cur = Cursor::new(&bytes);
	let decoded = decode_str(&mut cur, "%x%dl", &[4]).expect("decode");
	assert_eq!(decoded.fields().i32().expect("int"), 42);
}

#[test]
fn short_read_aborts_at_directive_boundary() {
	let bytes = [1, 0, 0, 0, 2, 0];
	let mut cur = Cursor::new(&bytes);
	let directives = Directives::parse("%dl%2hl").expect("parse");
	let err = decode(&mut cur, &directives, &[]).expect_err("second directive is short");
	assert!(matches!(err, AffyError::UnexpectedEof { .. }));
	assert_eq!(err.kind(), ErrorKind::Io);
	assert_eq!(cur.pos(), 4, "cursor rewinds to the failing directive");
}

#[test]
fn oversized_fixed_repeat_fails_before_allocating() {
	let bytes = [0_u8; 4];
	let mut cur = Cursor::new(&bytes);
	let err = decode_str(&mut cur, "%999999999999999c", &[]).expect_err("repeat exceeds buffer");
	assert!(matches!(err, AffyError::UnexpectedEof { rem: 4, .. }));
	assert_eq!(err.kind(), ErrorKind::Io);
	assert_eq!(cur.pos(), 0);

	let err = decode_str(&mut cur, "%4611686018427387904dl", &[]).expect_err("byte count overflows");
	assert!(matches!(err, AffyError::UnexpectedEof { need: usize::MAX, .. }));
	assert_eq!(cur.pos(), 0);
}

#[test]
fn unallocatable_padding_is_rejected() {
	let mut out = vec![7_u8];
	let err = encode_str(&mut out, "%x", &[i64::MAX], &[]).expect_err("padding overflows");
	assert_eq!(err.kind(), ErrorKind::InvalidArgument);
	assert_eq!(out, vec![7]);
}

#[test]
fn missing_runtime_argument_is_invalid_argument() {
	let bytes = [0_u8; 8];
	let mut cur = Cursor::new(&bytes);
	let err = decode_str(&mut cur, "%*hl", &[]).expect_err("no count");
	assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn encoder_rejects_width_mismatch() {
	let mut out = Vec::new();
	let err = encode_str(&mut out, "%hl", &[], &[Field::from_i32(1)]).expect_err("int into short");
	assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn encoder_pads_seek_directives() {
	let mut out = Vec::new();
	encode_str(&mut out, "%dl%x%Dl", &[3], &[Field::from_i32(64), Field::Widened(0.5)]).expect("encode");
	assert_eq!(out.len(), 4 + 3 + 4);
	assert_eq!(&out[4..7], &[0, 0, 0]);
	assert_eq!(&out[7..], &0.5_f32.to_le_bytes());
}
