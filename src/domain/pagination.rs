//! Client-side paging over an already loaded list.

pub const DEFAULT_PAGE_SIZE: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
	pub page_size: usize,
	/// 1-indexed.
	pub current_page: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
	pub items: Vec<T>,
	pub number: usize,
	pub total_pages: usize,
	pub total_items: usize,
}

impl Default for Pagination {
	fn default() -> Self {
		Self::new(DEFAULT_PAGE_SIZE)
	}
}

impl Pagination {
	pub fn new(page_size: usize) -> Self {
		Self {
			page_size: page_size.max(1),
			current_page: 1,
		}
	}

	pub fn total_pages(
		&self,
		total_items: usize,
	) -> usize {
		total_items.div_ceil(self.page_size)
	}

	pub fn reset(&mut self) {
		self.current_page = 1;
	}

	/// Moves to `page`, clamped to `1..=max(total_pages, 1)`.
	pub fn go_to(
		&mut self,
		page: usize,
		total_items: usize,
	) -> usize {
		self.current_page = page.clamp(1, self.total_pages(total_items).max(1));
		self.current_page
	}

	/// Slice `[(k-1)*size, k*size)` for page `k`.
	pub fn page<T: Clone>(
		&self,
		page: usize,
		items: &[T],
	) -> Page<T> {
		let start = page.saturating_sub(1).saturating_mul(self.page_size).min(items.len());
		let end = start.saturating_add(self.page_size).min(items.len());
		Page {
			items: items[start..end].to_vec(),
			number: page,
			total_pages: self.total_pages(items.len()),
			total_items: items.len(),
		}
	}

	pub fn current<T: Clone>(
		&self,
		items: &[T],
	) -> Page<T> {
		self.page(self.current_page, items)
	}
}

#[cfg(test)]
mod test {
	use rand::Rng;

	use super::Pagination;

	#[test]
	fn test_thirteen_items_in_pages_of_six() {
		let items: Vec<u32> = (0..13).collect();
		let pagination = Pagination::default();

		let first = pagination.page(1, &items);
		assert_eq!(first.items, vec![0, 1, 2, 3, 4, 5]);
		assert_eq!(first.total_pages, 3);

		let last = pagination.page(3, &items);
		assert_eq!(last.items, vec![12]);
		assert!(pagination.page(4, &items).items.is_empty());
	}

	#[test]
	fn test_go_to_clamps_page() {
		let mut pagination = Pagination::new(6);

		assert_eq!(pagination.go_to(9, 13), 3);
		assert_eq!(pagination.go_to(0, 13), 1);
		assert_eq!(pagination.go_to(2, 0), 1);
	}

	#[test]
	fn test_pages_cover_every_item_once() {
		let mut rng = rand::thread_rng();
		for _ in 0..20 {
			let items: Vec<usize> = (0..rng.gen_range(0..50)).collect();
			let pagination = Pagination::new(rng.gen_range(1..10));

			let pages = pagination.total_pages(items.len());
			let seen: Vec<usize> = (1..=pages).flat_map(|page| pagination.page(page, &items).items).collect();

			assert_eq!(seen, items);
		}
	}
}
