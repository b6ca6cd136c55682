use image::RgbImage;
use outfit_common::{
    describe_outfit, extract_dominant_colors, ClusterParams, ColorNamer, Mask,
};
use proptest::prelude::*;

fn small_params() -> ClusterParams {
    ClusterParams {
        restarts: 2,
        max_iterations: 50,
        ..ClusterParams::default()
    }
}

prop_compose! {
    fn arb_image()(width in 1u32..12, height in 1u32..12)
        (pixels in prop::collection::vec(any::<[u8; 3]>(), (width * height) as usize),
         width in Just(width),
         height in Just(height)) -> RgbImage {
        let raw: Vec<u8> = pixels.into_iter().flatten().collect();
        RgbImage::from_raw(width, height, raw).expect("buffer matches dimensions")
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn namer_is_total(rgb in any::<[u8; 3]>()) {
        let namer = ColorNamer::default();
        prop_assert!(!namer.name(rgb).is_empty());
    }

    #[test]
    fn fractions_sum_to_one(image in arb_image(), k in 1usize..6, seed in any::<u64>()) {
        let params = ClusterParams { clusters: k, seed, ..small_params() };
        let clusters = extract_dominant_colors(&image, None, &params).unwrap();

        prop_assert!(!clusters.is_empty());
        prop_assert!(clusters.len() <= k);
        prop_assert!(clusters.iter().all(|c| c.fraction > 0.0 && c.fraction <= 1.0));
        let sum: f64 = clusters.iter().map(|c| c.fraction).sum();
        prop_assert!((sum - 1.0).abs() < 1e-6, "sum was {}", sum);
    }

    #[test]
    fn masked_fractions_sum_to_one(image in arb_image(), bits in any::<u64>()) {
        let (w, h) = image.dimensions();
        let mask = Mask::from_fn(w, h, |x, y| (bits >> ((x + y * w) % 64)) & 1 == 1);
        let clusters = extract_dominant_colors(&image, Some(&mask), &small_params()).unwrap();

        if mask.foreground_count() == 0 {
            prop_assert!(clusters.is_empty());
        } else {
            let sum: f64 = clusters.iter().map(|c| c.fraction).sum();
            prop_assert!((sum - 1.0).abs() < 1e-6, "sum was {}", sum);
        }
    }

    #[test]
    fn empty_mask_describes_sentinel(image in arb_image()) {
        let (w, h) = image.dimensions();
        let clusters =
            extract_dominant_colors(&image, Some(&Mask::empty(w, h)), &small_params()).unwrap();
        prop_assert!(clusters.is_empty());
        prop_assert_eq!(describe_outfit(&clusters, &ColorNamer::default()), "No clothing detected.");
    }
}
