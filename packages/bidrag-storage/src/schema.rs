//! Hand-maintained description of the procurement tables, given to query generation as static
//! context, plus the display labels used when rendering result rows.

pub const SCHEMA_DESCRIPTION: &str = "\
-- 유찰된 입찰 정보
Table: bid_result_fails
	- bid_notice_no (text): 입찰 공고번호
	- openg_rslt_div_nm (text): 개찰 결과 구분명
	- nobid_rsn (text): 유찰 사유

-- 개찰 결과 (입찰 참여자별)
Table: bid_result_successes
	- bid_notice_no (text): 입찰 공고번호
	- prcbdr_bizno (text): 입찰자 사업자번호
	- prcbdr_nm (text): 입찰자명
	- prcbdr_ceo_nm (text): 입찰자 대표자명
	- bidprc_amt (numeric): 입찰가격금액
	- bidprc_rt (double precision): 입찰가격비율
	- openg_rank (integer): 개찰순위 (1 = 낙찰)
	- drwt_no1 (text): 추첨번호1
	- drwt_no2 (text): 추첨번호2
	- rmrk (text): 비고
	- bidprc_dt (timestamp): 입찰가격일자
	- openg_rslt_div_nm (text): 개찰 결과 구분명

-- 나라장터 입찰 공고
Table: naramarket_bids
	- bid_notice_no (text): 입찰 공고번호
	- bid_notice_nm (text): 입찰 공고명
	- ntce_kind_nm (text): 공고 종류명
	- bid_notice_date (date): 공고 일자
	- ntce_instt_nm (text): 공고기관명
	- dminstt_nm (text): 수요기관명
	- bid_method_nm (text): 입찰 방식명
	- cntrct_cncls_method_nm (text): 계약체결방식명
	- ntce_instt_ofcl_nm (text): 담당자명
	- ntce_instt_ofcl_tel_no (text): 담당자 전화번호
	- ntce_instt_ofcl_email_adrs (text): 담당자 이메일
	- bid_qlfct_rgst_dt (timestamp): 입찰참가자격등록마감일시
	- bid_begin_dt (timestamp): 입찰개시일시
	- bid_close_dt (timestamp): 입찰마감일시
	- openg_dt (timestamp): 개찰일시
	- asign_bdgt_amt (numeric): 배정예산금액
	- presmpt_price (numeric): 추정가격
	- vat (numeric): 부가가치세
	- srvce_div_nm (text): 용역구분명
	- pub_prcrmnt_lrg_clsfc_nm (text): 공공조달대분류명
	- pub_prcrmnt_mid_clsfc_nm (text): 공공조달중분류명
	- pub_prcrmnt_clsfc_nm (text): 공공조달분류명
	- bid_notice_url (text): 입찰공고URL
	- bid_prgs_stat_nm (text): 입찰진행상태명 (유찰, 자체 입찰 공고, 개찰 전, 개찰완료, 개찰 미진행, 직찰)
";

/// Column names and the aliases used in the generation examples, mapped to Korean labels.
const COLUMN_LABELS: &[(&str, &str)] = &[
	("bid_notice_no", "공고번호"),
	("bid_notice_nm", "공고명"),
	("ntce_kind_nm", "공고종류"),
	("bid_notice_date", "공고일자"),
	("ntce_instt_nm", "공고기관"),
	("dminstt_nm", "수요기관"),
	("bid_method_nm", "입찰방식"),
	("cntrct_cncls_method_nm", "계약방식"),
	("ntce_instt_ofcl_nm", "담당자"),
	("ntce_instt_ofcl_tel_no", "담당자 연락처"),
	("ntce_instt_ofcl_email_adrs", "담당자 이메일"),
	("bid_qlfct_rgst_dt", "참가자격등록마감"),
	("bid_begin_dt", "입찰개시"),
	("bid_close_dt", "입찰마감"),
	("openg_dt", "개찰일시"),
	("asign_bdgt_amt", "배정예산"),
	("presmpt_price", "추정가격"),
	("vat", "부가세"),
	("srvce_div_nm", "용역구분"),
	("pub_prcrmnt_lrg_clsfc_nm", "대분류"),
	("pub_prcrmnt_mid_clsfc_nm", "중분류"),
	("pub_prcrmnt_clsfc_nm", "조달분류"),
	("bid_notice_url", "공고URL"),
	("bid_prgs_stat_nm", "진행상태"),
	("openg_rslt_div_nm", "개찰결과"),
	("nobid_rsn", "유찰사유"),
	("prcbdr_bizno", "사업자번호"),
	("prcbdr_nm", "업체명"),
	("prcbdr_ceo_nm", "대표자"),
	("bidprc_amt", "입찰금액"),
	("bidprc_rt", "투찰률"),
	("openg_rank", "순위"),
	("bidprc_dt", "입찰일시"),
	("rmrk", "비고"),
	("year", "연도"),
	("month", "월"),
	("count", "건수"),
	("fail_count", "유찰 건수"),
	("success_count", "낙찰 건수"),
	("total_notices", "공고 건수"),
	("company_name", "업체명"),
	("ceo_name", "대표자"),
	("institution_name", "기관명"),
	("demand_institution", "수요기관"),
	("notice_name", "공고명"),
	("notice_date", "공고일자"),
	("avg_bid_amount", "평균 입찰금액"),
	("avg_budget", "평균 예산"),
	("budget_amount", "예산금액"),
	("bid_amount", "입찰금액"),
	("bid_ratio", "투찰률"),
	("winner_name", "낙찰업체"),
	("winning_amount", "낙찰금액"),
	("winning_ratio", "낙찰률"),
	("rank", "순위"),
	("status", "진행상태"),
	("result_status", "개찰결과"),
	("bid_method", "입찰방식"),
	("contract_method", "계약방식"),
	("bid_begin", "입찰개시"),
	("bid_close", "입찰마감"),
	("open_date", "개찰일시"),
	("manager_name", "담당자"),
	("manager_contact", "담당자 연락처"),
];

pub fn column_label(column: &str) -> Option<&'static str> {
	let column = column.trim();

	COLUMN_LABELS
		.iter()
		.find(|(name, _)| name.eq_ignore_ascii_case(column))
		.map(|(_, label)| *label)
}
