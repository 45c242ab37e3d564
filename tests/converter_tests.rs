// SPDX-License-Identifier: MPL-2.0

//! Integration tests for YUV to NV21 conversion

use edge_viewer::backends::camera::synthetic::{ChromaLayout, frame_from_planes};
use edge_viewer::backends::camera::types::{FrameData, Plane, RawFrame, YuvPlanes};
use edge_viewer::errors::ConversionError;
use edge_viewer::media::{convert, nv21_len};

const Y: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
const U: [u8; 4] = [100, 101, 102, 103];
const V: [u8; 4] = [200, 201, 202, 203];
const EXPECTED_CHROMA: [u8; 8] = [200, 100, 201, 101, 202, 102, 203, 103];

fn expected() -> Vec<u8> {
    let mut out = Y.to_vec();
    out.extend_from_slice(&EXPECTED_CHROMA);
    out
}

#[test]
fn test_every_layout_produces_identical_nv21() {
    for layout in [
        ChromaLayout::Planar,
        ChromaLayout::SemiPlanarVu,
        ChromaLayout::SemiPlanarUv,
    ] {
        for padding in [0, 3, 12] {
            let raw = frame_from_planes(4, 4, &Y, &U, &V, layout, padding, 1).unwrap();
            let converted = convert(&raw).unwrap();
            assert_eq!(
                converted.data,
                expected(),
                "layout {:?} padding {}",
                layout,
                padding
            );
            assert_eq!(converted.data.len(), nv21_len(4, 4));
            assert_eq!(converted.luma(), &Y);
            assert_eq!(converted.chroma(), &EXPECTED_CHROMA);
        }
    }
}

#[test]
fn test_conversion_is_deterministic() {
    let raw = frame_from_planes(4, 4, &Y, &U, &V, ChromaLayout::Planar, 5, 9).unwrap();
    let first = convert(&raw).unwrap();
    let second = convert(&raw).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.sequence, 9);
}

#[test]
fn test_odd_dimensions() {
    // 3x3 luma, 2x2 chroma
    let y: Vec<u8> = (0..9).collect();
    let u = [10, 11, 12, 13];
    let v = [20, 21, 22, 23];
    let raw = frame_from_planes(3, 3, &y, &u, &v, ChromaLayout::SemiPlanarUv, 1, 0).unwrap();
    let converted = convert(&raw).unwrap();
    assert_eq!(converted.data.len(), 9 + 8);
    assert_eq!(&converted.data[..9], y.as_slice());
    assert_eq!(&converted.data[9..], &[20, 10, 21, 11, 22, 12, 23, 13]);
}

#[test]
fn test_short_buffer_is_rejected_at_construction() {
    let planes = YuvPlanes {
        y: Plane::new(0, 4, 1),
        u: Plane::new(16, 2, 1),
        v: Plane::new(20, 2, 1),
    };
    // One byte short of the V plane
    let data = FrameData::from(vec![0u8; 23]);
    let err = RawFrame::new(4, 4, data, planes, 0).unwrap_err();
    assert!(matches!(
        err,
        ConversionError::PlaneOutOfBounds {
            plane: "Chroma V",
            ..
        }
    ));
}
