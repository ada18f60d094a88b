use crate::camera::Resolution;
use tracing::trace;

/// Strategy for picking a resolution for a target surface
pub trait SizePolicy: Send {
    fn select(&self, width: u32, height: u32, candidates: &[Resolution]) -> Option<Resolution>;
}

impl<F> SizePolicy for F
where
    F: Fn(u32, u32, &[Resolution]) -> Option<Resolution> + Send,
{
    fn select(&self, width: u32, height: u32, candidates: &[Resolution]) -> Option<Resolution> {
        self(width, height, candidates)
    }
}

/// Default policy: closest aspect ratio among sizes taller than the target is wide
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeNegotiator;

impl SizePolicy for SizeNegotiator {
    fn select(&self, width: u32, height: u32, candidates: &[Resolution]) -> Option<Resolution> {
        select_optimal_size(width, height, candidates)
    }
}

/// Pick the candidate whose aspect ratio is closest to the target's.
///
/// The sensor is mounted in landscape while the surface is laid out in
/// portrait, so the target ratio is read as `height / width` while each
/// candidate is read as `width / height`, and a candidate only qualifies
/// when its height exceeds the target width. Ties keep the earliest candidate.
pub fn select_optimal_size(
    target_width: u32,
    target_height: u32,
    candidates: &[Resolution],
) -> Option<Resolution> {
    if target_width == 0 {
        return None;
    }

    let target_ratio = target_height as f64 / target_width as f64;

    let mut optimal = None;
    let mut min_difference = f64::MAX;

    for candidate in candidates {
        if candidate.height == 0 {
            continue;
        }

        let difference = (candidate.aspect_ratio() - target_ratio).abs();

        if difference < min_difference && candidate.height > target_width {
            trace!(
                "Size {} improves ratio difference to {:.4}",
                candidate,
                difference
            );
            optimal = Some(*candidate);
            min_difference = difference;
        }
    }

    optimal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(list: &[(u32, u32)]) -> Vec<Resolution> {
        list.iter().copied().map(Resolution::from).collect()
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(select_optimal_size(400, 300, &[]), None);
    }

    #[test]
    fn test_no_candidate_passes_height_filter() {
        let candidates = sizes(&[(1920, 400), (800, 300), (176, 144)]);
        assert_eq!(select_optimal_size(400, 300, &candidates), None);
    }

    #[test]
    fn test_filter_compares_height_against_target_width() {
        // 640x480 has the exact ratio but 480 is not above the target width of 480
        let candidates = sizes(&[(640, 480), (1280, 720)]);
        assert_eq!(
            select_optimal_size(480, 360, &candidates),
            Some(Resolution::new(1280, 720))
        );

        let candidates = sizes(&[(640, 481)]);
        assert_eq!(
            select_optimal_size(480, 10_000, &candidates),
            Some(Resolution::new(640, 481))
        );
    }

    #[test]
    fn test_target_ratio_is_axis_swapped() {
        // Target 300x400 reads as 400/300 = 1.333, so the 4:3 landscape size wins
        let candidates = sizes(&[(1280, 720), (1600, 1200)]);
        assert_eq!(
            select_optimal_size(300, 400, &candidates),
            Some(Resolution::new(1600, 1200))
        );

        // Target 1080x1920 reads as 1920/1080 = 1.778, so 16:9 wins
        let candidates = sizes(&[(1600, 1200), (1920, 1080), (2560, 1440)]);
        assert_eq!(
            select_optimal_size(1080, 1920, &candidates),
            Some(Resolution::new(2560, 1440))
        );
    }

    #[test]
    fn test_candidate_ratio_is_not_swapped() {
        // Target 0.75; a portrait 600x800 candidate matches exactly, landscape 800x600 does not
        let candidates = sizes(&[(800, 600), (600, 800)]);
        assert_eq!(
            select_optimal_size(400, 300, &candidates),
            Some(Resolution::new(600, 800))
        );
    }

    #[test]
    fn test_tie_keeps_list_order() {
        let candidates = sizes(&[(800, 600), (640, 480), (176, 144)]);
        assert_eq!(
            select_optimal_size(400, 300, &candidates),
            Some(Resolution::new(800, 600))
        );

        let candidates = sizes(&[(640, 480), (800, 600), (176, 144)]);
        assert_eq!(
            select_optimal_size(400, 300, &candidates),
            Some(Resolution::new(640, 480))
        );
    }

    #[test]
    fn test_result_minimizes_ratio_difference() {
        let candidates = sizes(&[
            (4000, 3000),
            (3840, 2160),
            (2048, 1536),
            (1920, 1080),
            (1280, 960),
            (1280, 720),
            (640, 480),
        ]);

        for (width, height) in [(720, 1280), (600, 800), (400, 300), (500, 500), (1000, 1500)] {
            let target = height as f64 / width as f64;
            let chosen = select_optimal_size(width, height, &candidates)
                .unwrap_or_else(|| panic!("no size for {}x{}", width, height));
            let chosen_difference = (chosen.aspect_ratio() - target).abs();

            let qualifying: Vec<_> = candidates.iter().filter(|c| c.height > width).collect();
            assert!(qualifying.contains(&&chosen));
            for candidate in qualifying {
                assert!(chosen_difference <= (candidate.aspect_ratio() - target).abs());
            }

            let first_best = candidates
                .iter()
                .find(|c| {
                    c.height > width && (c.aspect_ratio() - target).abs() == chosen_difference
                })
                .copied();
            assert_eq!(first_best, Some(chosen));
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let candidates = sizes(&[(640, 0), (800, 600)]);
        assert_eq!(
            select_optimal_size(400, 300, &candidates),
            Some(Resolution::new(800, 600))
        );
        assert_eq!(select_optimal_size(0, 300, &candidates), None);
    }

    #[test]
    fn test_closure_policy() {
        let largest = |_: u32, _: u32, candidates: &[Resolution]| {
            candidates.iter().max_by_key(|c| c.width * c.height).copied()
        };
        let candidates = sizes(&[(640, 480), (1920, 1080)]);
        assert_eq!(
            largest.select(1, 1, &candidates),
            Some(Resolution::new(1920, 1080))
        );
        assert_eq!(
            SizeNegotiator.select(400, 300, &candidates),
            Some(Resolution::new(640, 480))
        );
    }
}
