/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX 4.4 tag numbers used by the gateway.

#![allow(missing_docs)]

// Standard header and trailer
pub const BEGIN_STRING: u32 = 8;
pub const BODY_LENGTH: u32 = 9;
pub const CHECKSUM: u32 = 10;
pub const MSG_SEQ_NUM: u32 = 34;
pub const MSG_TYPE: u32 = 35;
pub const POSS_DUP_FLAG: u32 = 43;
pub const SENDER_COMP_ID: u32 = 49;
pub const SENDING_TIME: u32 = 52;
pub const TARGET_COMP_ID: u32 = 56;
pub const ORIG_SENDING_TIME: u32 = 122;

// Session level
pub const BEGIN_SEQ_NO: u32 = 7;
pub const END_SEQ_NO: u32 = 16;
pub const NEW_SEQ_NO: u32 = 36;
pub const REF_SEQ_NUM: u32 = 45;
pub const TEXT: u32 = 58;
pub const ENCRYPT_METHOD: u32 = 98;
pub const HEART_BT_INT: u32 = 108;
pub const TEST_REQ_ID: u32 = 112;
pub const GAP_FILL_FLAG: u32 = 123;
pub const RESET_SEQ_NUM_FLAG: u32 = 141;
pub const REF_TAG_ID: u32 = 371;
pub const REF_MSG_TYPE: u32 = 372;
pub const SESSION_REJECT_REASON: u32 = 373;
pub const BUSINESS_REJECT_REASON: u32 = 380;
pub const USERNAME: u32 = 553;
pub const PASSWORD: u32 = 554;

// Orders and executions
pub const ACCOUNT: u32 = 1;
pub const AVG_PX: u32 = 6;
pub const CL_ORD_ID: u32 = 11;
pub const CUM_QTY: u32 = 14;
pub const EXEC_ID: u32 = 17;
pub const LAST_PX: u32 = 31;
pub const LAST_QTY: u32 = 32;
pub const ORDER_ID: u32 = 37;
pub const ORDER_QTY: u32 = 38;
pub const ORD_STATUS: u32 = 39;
pub const ORD_TYPE: u32 = 40;
pub const ORIG_CL_ORD_ID: u32 = 41;
pub const PRICE: u32 = 44;
pub const SIDE: u32 = 54;
pub const SYMBOL: u32 = 55;
pub const HANDL_INST: u32 = 21;
pub const TIME_IN_FORCE: u32 = 59;
pub const TRANSACT_TIME: u32 = 60;
pub const TRADE_DATE: u32 = 75;
pub const CXL_REJ_REASON: u32 = 102;
pub const EXEC_TYPE: u32 = 150;
pub const LEAVES_QTY: u32 = 151;
pub const CXL_REJ_RESPONSE_TO: u32 = 434;
pub const MASS_STATUS_REQ_ID: u32 = 584;
pub const MASS_STATUS_REQ_TYPE: u32 = 585;

// Market data
pub const MD_REQ_ID: u32 = 262;
pub const SUBSCRIPTION_REQUEST_TYPE: u32 = 263;
pub const MARKET_DEPTH: u32 = 264;
pub const MD_UPDATE_TYPE: u32 = 265;
pub const NO_MD_ENTRY_TYPES: u32 = 267;
pub const NO_MD_ENTRIES: u32 = 268;
pub const MD_ENTRY_TYPE: u32 = 269;
pub const MD_ENTRY_PX: u32 = 270;
pub const MD_ENTRY_SIZE: u32 = 271;
pub const MD_UPDATE_ACTION: u32 = 279;
pub const MD_REQ_REJ_REASON: u32 = 281;
pub const NO_RELATED_SYM: u32 = 146;

// Securities
pub const SECURITY_REQ_ID: u32 = 320;
pub const SECURITY_REQUEST_TYPE: u32 = 321;
pub const SECURITY_RESPONSE_ID: u32 = 322;
pub const SECURITY_RESPONSE_TYPE: u32 = 323;
pub const SECURITY_DESC: u32 = 107;
pub const SECURITY_TYPE: u32 = 167;
pub const PRODUCT: u32 = 460;
pub const CONTRACT_MULTIPLIER: u32 = 231;
pub const SECURITY_LIST_REQUEST_TYPE: u32 = 559;
pub const SECURITY_REQUEST_RESULT: u32 = 560;
pub const TOT_NO_RELATED_SYM: u32 = 393;

// Positions
pub const ACCOUNT_TYPE: u32 = 581;
pub const NO_POSITIONS: u32 = 702;
pub const POS_TYPE: u32 = 703;
pub const LONG_QTY: u32 = 704;
pub const SHORT_QTY: u32 = 705;
pub const POS_REQ_ID: u32 = 710;
pub const CLEARING_BUSINESS_DATE: u32 = 715;
pub const POS_MAINT_RPT_ID: u32 = 721;
pub const POS_REQ_TYPE: u32 = 724;
pub const TOTAL_NUM_POS_REPORTS: u32 = 727;
pub const POS_REQ_RESULT: u32 = 728;
pub const POS_REQ_STATUS: u32 = 729;
pub const SETTL_PRICE: u32 = 730;

// Trade capture
pub const TRADE_REQUEST_ID: u32 = 568;
pub const TRADE_REQUEST_TYPE: u32 = 569;
pub const NO_DATES: u32 = 580;
pub const TRADE_REPORT_ID: u32 = 571;
pub const TRADE_REQUEST_RESULT: u32 = 749;
pub const TRADE_REQUEST_STATUS: u32 = 750;
