use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u16(0, 200), 0);
}

#[test]
fn over_respects_source_alpha() {
    assert_eq!(over_px([10, 20, 30, 255], [0, 0, 0, 0]), [10, 20, 30, 255]);
    assert_eq!(over_px([10, 20, 30, 255], [1, 2, 3, 255]), [1, 2, 3, 255]);
    let half = over_px([0, 0, 200, 255], [100, 0, 0, 128]);
    assert_eq!(half[3], 255);
    assert_eq!(half[0], 100);
    assert!(half[2] > 90 && half[2] < 110);
}

#[test]
fn downsampled_len_floors_and_clamps_to_one() {
    assert_eq!(downsampled_len(400, 4.0), 100);
    assert_eq!(downsampled_len(401, 4.0), 100);
    assert_eq!(downsampled_len(3, 4.0), 1);
    assert_eq!(downsampled_len(0, 4.0), 1);
    assert_eq!(downsampled_len(100, 2.5), 40);
}
